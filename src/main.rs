use clap::Parser;

fn main() {
    let options = insights_lib::RunOptions::parse();
    if let Err(e) = insights_lib::run(options) {
        eprintln!("portfolio-insights: {:#}", e);
        std::process::exit(1);
    }
}
