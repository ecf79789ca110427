#[cfg(test)]
mod tests {
    use crate::cli::{parse_parallelism, parse_timeout_ms, Cli, Command};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_parse_parallelism() {
        assert_eq!(parse_parallelism("1"), Ok(1));
        assert_eq!(parse_parallelism("8"), Ok(8));
        assert!(parse_parallelism("0").is_err());
        assert!(parse_parallelism("-2").is_err());
        assert!(parse_parallelism("many").is_err());
    }

    #[test]
    fn test_parse_timeout_ms() {
        assert_eq!(parse_timeout_ms("5000"), Ok(5000));
        assert_eq!(
            parse_timeout_ms("0").unwrap_err(),
            "Timeout must be greater than zero"
        );
        assert!(parse_timeout_ms("5s").is_err());
    }

    #[test]
    fn test_run_command_defaults() {
        let cli = Cli::try_parse_from(["vigil", "run", "scenarios/create.toml"]).unwrap();
        assert!(!cli.verbose);
        assert!(!cli.quiet);

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.scenarios, vec![PathBuf::from("scenarios/create.toml")]);
                assert!(args.config.is_none());
                assert!(args.parallel.is_none());
                assert!(!args.headed);

                let flags = args.config_flags();
                assert!(flags.parallelism.is_none());
                assert!(flags.artifacts_dir.is_none());
            }
            Command::Check(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_command_flags() {
        let cli = Cli::try_parse_from([
            "vigil",
            "run",
            "a.toml",
            "b.json",
            "--parallel",
            "3",
            "--artifacts-dir",
            "out",
            "--step-timeout",
            "2500",
            "--headed",
            "--config",
            "ci.toml",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scenarios.len(), 2);
        assert_eq!(args.config, Some(PathBuf::from("ci.toml")));

        let flags = args.config_flags();
        assert_eq!(flags.parallelism, Some(3));
        assert_eq!(flags.artifacts_dir, Some(PathBuf::from("out")));
        assert_eq!(flags.step_timeout_ms, Some(2500));
        assert!(flags.headed);
    }

    #[test]
    fn test_run_requires_scenarios() {
        assert!(Cli::try_parse_from(["vigil", "run"]).is_err());
    }

    #[test]
    fn test_run_rejects_zero_parallelism() {
        assert!(Cli::try_parse_from(["vigil", "run", "a.toml", "-j", "0"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["vigil", "check", "a.toml", "--verbose", "--no-color"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Command::Check(_)));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["vigil", "-v", "-q", "check", "a.toml"]).is_err());
    }
}
