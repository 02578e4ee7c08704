use ball_larus::artifact::write_artifact;
use ball_larus::core::{CfgAdaptor, Graph};
use ball_larus::test_ir::{TestCfg, TestCfgBuilder};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dump_dag")]
#[command(about = "Encode a .tcf file and print each function's artifact", long_about = None)]
struct Cli {
    /// Input .tcf file
    input: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let content = std::fs::read_to_string(&cli.input)?;
    let cfg = TestCfg::parse(&content)?;
    let mut builder = TestCfgBuilder::new(cfg);

    let funcs: Vec<_> = builder.funcs().collect();
    let mut out = std::io::stdout().lock();
    for func in funcs {
        builder.switch_func(func);
        let name = builder.func_name(func).to_string();
        let graph = Graph::build(&builder)?;
        println!("; {name}: {} paths", graph.num_paths());
        write_artifact(&mut out, &graph, &builder)?;
    }
    Ok(())
}
