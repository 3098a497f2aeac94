use clap::Parser;
use web_case_runner::cli::commands::{cmd_run, cmd_validate};
use web_case_runner::cli::config::{Cli, Commands, RunOverrides, load_config};
use web_case_runner::trace::logger::{LogLevel, init_logger};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(LogLevel::from_verbosity(cli.verbose));
    let config = load_config(cli.config.as_deref());

    let passed = match cli.command {
        Commands::Run {
            suite,
            execution_id,
            continue_on_failure,
            stop_on_failure,
            reports_root,
            driver,
            webdriver_url,
            no_render,
        } => {
            let overrides = RunOverrides {
                continue_on_failure: RunOverrides::policy_flags(continue_on_failure, stop_on_failure),
                reports_root,
                driver,
                webdriver_url,
                no_render,
            };
            cmd_run(&suite, &execution_id, config, &overrides)?
        }
        Commands::Validate { suite } => cmd_validate(&suite)?,
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
