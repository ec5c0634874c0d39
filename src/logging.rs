use anyhow::Context as _;

/// Console verbosity selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn default_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbosity` when set.
pub fn init(verbosity: Verbosity) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(verbosity.default_directive()))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_directives() {
        assert_eq!(Verbosity::Quiet.default_directive(), "warn");
        assert_eq!(Verbosity::Normal.default_directive(), "info");
        assert_eq!(Verbosity::Verbose.default_directive(), "debug");
    }
}
