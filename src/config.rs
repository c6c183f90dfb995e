use crate::cli::args::Cli;
use crate::core::target::TargetDescriptor;
use crate::utils::time;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const ENV_URL: &str = "IMGPROBE_URL";
pub const ENV_API_ENDPOINT: &str = "IMGPROBE_API_URL";
pub const ENV_API_KEY: &str = "IMGPROBE_API_KEY";
pub const ENV_TIMEOUT: &str = "IMGPROBE_TIMEOUT_SECS";

/// The fully resolved input for one run: the engine's target plus where the
/// artifacts go. Flags win over environment variables; the engine itself
/// never reads either.
pub struct ResolvedRun {
    pub target: TargetDescriptor,
    pub output_dir: PathBuf,
}

pub fn resolve(cli: &Cli) -> Result<ResolvedRun> {
    let raw_url = cli
        .url
        .clone()
        .or_else(|| std::env::var(ENV_URL).ok())
        .with_context(|| format!("no image URL given; pass --url or set {ENV_URL}"))?;
    let resource_url = parse_http_url(&raw_url).context("invalid image URL")?;

    let mut target = TargetDescriptor::new(resource_url);

    let endpoint = cli
        .api_endpoint
        .clone()
        .or_else(|| std::env::var(ENV_API_ENDPOINT).ok());
    let credential = cli
        .api_key
        .clone()
        .or_else(|| std::env::var(ENV_API_KEY).ok());
    match (endpoint, credential) {
        (Some(endpoint), Some(credential)) => {
            let endpoint = parse_http_url(&endpoint).context("invalid API endpoint")?;
            target = target.with_api(endpoint, credential);
        }
        (Some(endpoint), None) => {
            tracing::warn!("API endpoint given without a credential; API probes will be skipped");
            target.api_endpoint = Some(parse_http_url(&endpoint).context("invalid API endpoint")?);
        }
        (None, Some(_)) => {
            bail!("an API credential was given without an endpoint; pass --api-endpoint or set {ENV_API_ENDPOINT}");
        }
        (None, None) => {}
    }

    let timeout_secs = match cli.timeout {
        Some(secs) => Some(secs),
        None => std::env::var(ENV_TIMEOUT)
            .ok()
            .map(|raw| {
                raw.parse::<u64>()
                    .with_context(|| format!("{ENV_TIMEOUT} is not a number: {raw:?}"))
            })
            .transpose()?,
    };
    if let Some(secs) = timeout_secs {
        if secs == 0 {
            bail!("probe timeout must be positive");
        }
        target = target.with_timeout(Duration::from_secs(secs));
    }

    if let Some(case) = &cli.case {
        target = target.with_case(case.clone());
    }

    let output_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(cli.case.as_deref()));

    Ok(ResolvedRun { target, output_dir })
}

/// Platform data dir by default, one subdirectory per case.
pub fn default_output_dir(case_id: Option<&str>) -> PathBuf {
    let base = directories::ProjectDirs::from("", "", "imgprobe")
        .map(|dirs| dirs.data_dir().join("results"))
        .unwrap_or_else(|| PathBuf::from("imgprobe-results"));
    match case_id {
        Some(id) => base.join(time::sanitize_component(id)),
        None => base,
    }
}

fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("unsupported scheme {:?}; only http(s) targets can be probed", url.scheme());
    }
    if url.host_str().is_none() {
        bail!("URL has no host: {raw:?}");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> Cli {
        use clap::Parser;
        Cli::parse_from(std::iter::once("imgprobe").chain(args.iter().copied()))
    }

    #[test]
    fn flags_build_a_full_descriptor() {
        let cli = cli(&[
            "--url",
            "https://img.example.com/a.jpg",
            "--api-endpoint",
            "https://api.example.com/v1/generations",
            "--api-key",
            "tok",
            "--case",
            "CASE-9",
            "--timeout",
            "30",
        ]);
        let resolved = resolve(&cli).unwrap();

        assert_eq!(
            resolved.target.resource_url.as_str(),
            "https://img.example.com/a.jpg"
        );
        assert!(resolved.target.has_api());
        assert_eq!(resolved.target.case_id.as_deref(), Some("CASE-9"));
        assert_eq!(resolved.target.probe_timeout, Duration::from_secs(30));
        assert!(resolved
            .output_dir
            .to_string_lossy()
            .contains("CASE-9"));
    }

    // one test owns IMGPROBE_URL to keep the process environment race-free
    #[test]
    fn url_comes_from_flag_env_or_nowhere() {
        let result = resolve(&cli(&[]));
        assert!(result.is_err());

        std::env::set_var(ENV_URL, "https://env.example.com/b.png");
        let resolved = resolve(&cli(&[])).unwrap();
        std::env::remove_var(ENV_URL);

        assert_eq!(
            resolved.target.resource_url.as_str(),
            "https://env.example.com/b.png"
        );
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        let result = resolve(&cli(&["--url", "ftp://img.example.com/a.jpg"]));
        assert!(result.unwrap_err().to_string().contains("invalid image URL"));
    }

    #[test]
    fn credential_without_endpoint_is_rejected() {
        let result = resolve(&cli(&["--url", "https://img.example.com/a.jpg", "--api-key", "tok"]));
        assert!(result.is_err());
    }

    #[test]
    fn endpoint_without_credential_keeps_api_probes_locked() {
        let resolved = resolve(&cli(&[
            "--url",
            "https://img.example.com/a.jpg",
            "--api-endpoint",
            "https://api.example.com/v1",
        ]))
        .unwrap();
        assert!(!resolved.target.has_api());
        assert!(resolved.target.api_endpoint.is_some());
    }

    #[test]
    fn explicit_output_dir_wins() {
        let resolved = resolve(&cli(&[
            "--url",
            "https://img.example.com/a.jpg",
            "--output",
            "/tmp/probe-out",
        ]))
        .unwrap();
        assert_eq!(resolved.output_dir, PathBuf::from("/tmp/probe-out"));
    }

}
