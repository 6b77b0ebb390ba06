use std::net::SocketAddr;

use clap::Parser;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "procwire-provider",
    version,
    about = "Example provider serving location procedures as HTTP callbacks"
)]
pub struct Cli {
    /// Address the procedure endpoints listen on
    #[arg(long, env = "PROVIDER_BIND", default_value = "0.0.0.0:9005")]
    pub bind: SocketAddr,

    /// Base URL the orchestrator uses to call back into this provider
    #[arg(long, env = "PROVIDER_PUBLIC_URL", default_value = "http://127.0.0.1:9005")]
    pub public_url: Url,

    /// Entity API base URL procedures act on
    #[arg(
        long,
        env = "PROVIDER_ENTITY_URL",
        default_value = "http://127.0.0.1:3000/services"
    )]
    pub entity_url: String,

    /// Provider prefix; procedure calls fail until it is set
    #[arg(long, env = "PROVIDER_PREFIX")]
    pub prefix: Option<String>,

    /// Provider version used in entity URLs
    #[arg(long, env = "PROVIDER_VERSION", default_value = "0.1.0")]
    pub version_tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cli = Cli::try_parse_from(["procwire-provider"]).expect("defaults should parse");
        assert_eq!(cli.bind.port(), 9005);
        assert_eq!(cli.public_url.as_str(), "http://127.0.0.1:9005/");
        assert_eq!(cli.version_tag, "0.1.0");
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "procwire-provider",
            "--prefix",
            "location_provider",
            "--public-url",
            "https://provider.example/location",
        ])
        .expect("flags should parse");
        assert_eq!(cli.prefix.as_deref(), Some("location_provider"));
        assert_eq!(cli.public_url.path(), "/location");
    }

    #[test]
    fn rejects_invalid_public_url() {
        assert!(Cli::try_parse_from(["procwire-provider", "--public-url", "not a url"]).is_err());
    }
}
