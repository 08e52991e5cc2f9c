use crate::{
    cli::OutputFormat,
    config::AppConfig,
    error::{CliError, Result},
    output::{ExtractionReport, OutputManager, write_output},
};
use chrono::Utc;
#[cfg(feature = "colored-output")]
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use link_cache::{CacheKey, CachedLinksRepository, filter_out_expired_links};
use link_extractors::{
    ClientConfig, ExtractorFactory, LinkLoader, LinkRequest, LoadStatus, LoaderConfig,
    ProviderRegistry, create_client,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info};
use url::Url;

/// Options of the `extract` subcommand.
#[derive(Debug, Default)]
pub struct ExtractOptions<'a> {
    pub headers: &'a [String],
    pub provider: Option<&'a str>,
    pub film: Option<&'a str>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub output: Option<OutputFormat>,
    pub output_file: Option<&'a Path>,
    pub include_expired: bool,
}

pub struct CommandExecutor {
    config: AppConfig,
    timeout: Duration,
    extractor_factory: ExtractorFactory,
    loader: LinkLoader,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, client_config: ClientConfig) -> Result<Self> {
        let timeout = client_config.timeout;
        let client = create_client(&client_config)?;
        let extractor_factory = ExtractorFactory::new(client);
        let loader = LinkLoader::new(
            Arc::new(CachedLinksRepository::default()),
            Arc::new(ProviderRegistry::new()),
            LoaderConfig {
                channel_capacity: config.channel_capacity,
                // The whole extraction is bounded below instead.
                provider_timeout: None,
            },
        );

        Ok(Self {
            config,
            timeout,
            extractor_factory,
            loader,
        })
    }

    pub async fn extract(&self, url: &str, options: ExtractOptions<'_>) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|e| CliError::invalid_input(format!("Invalid URL {url}: {e}")))?;
        let extractor = self.extractor_factory.create_extractor(url)?;
        let headers = parse_headers(options.headers)?;

        let key = self.cache_key(&parsed, extractor.name(), &options)?;
        info!(key = %key, extractor = %extractor.name(), "extracting links");

        let pb = self.create_progress_bar(&format!("Extracting with {}...", extractor.name()));
        let result = timeout(
            self.timeout,
            self.loader
                .load_extractor(LinkRequest::new(key.clone()), &extractor, &parsed, &headers),
        )
        .await;
        pb.finish_and_clear();

        let status = result.map_err(|_| CliError::timeout())?;
        debug!(?status, "extraction finished");

        let mut links = self
            .loader
            .repository()
            .get_cache(&key)
            .ok_or_else(CliError::no_streams_found)?;
        if !options.include_expired {
            links = filter_out_expired_links(&links, Utc::now());
        }

        if let LoadStatus::Failed { message, .. } = &status {
            if links.has_no_stream_links() {
                return Err(CliError::Extraction(message.clone()));
            }
        }
        if links.has_no_stream_links() {
            return Err(CliError::no_streams_found());
        }

        let report = ExtractionReport {
            key: &key,
            extractor: extractor.name(),
            status: &status,
            links: &links,
        };
        let format = options.output.unwrap_or(self.config.default_output_format);
        let output = OutputManager::new(self.config.colored_output).format_report(&report, format)?;
        write_output(&output, options.output_file)
    }

    /// Provider: explicit, then configured, then the extractor name. Film:
    /// explicit, then the media id of the URL.
    fn cache_key(
        &self,
        url: &Url,
        extractor_name: &str,
        options: &ExtractOptions<'_>,
    ) -> Result<CacheKey> {
        let provider = options
            .provider
            .map(str::to_string)
            .or_else(|| self.config.default_provider.clone())
            .unwrap_or_else(|| extractor_name.to_lowercase());
        let film = options
            .film
            .map(str::to_string)
            .or_else(|| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| url.to_string());
        CacheKey::try_new(provider, film, options.season, options.episode)
            .map_err(|e| CliError::invalid_input(e.to_string()))
    }

    pub fn list_hosts(&self, output_format: OutputFormat) -> Result<()> {
        let hosts = self.extractor_factory.supported_hosts();

        match output_format {
            OutputFormat::Json | OutputFormat::JsonCompact => {
                let hosts_json: Vec<serde_json::Value> = hosts
                    .iter()
                    .map(|name| serde_json::json!({ "name": name }))
                    .collect();

                let output = if matches!(output_format, OutputFormat::Json) {
                    serde_json::to_string_pretty(&hosts_json)?
                } else {
                    serde_json::to_string(&hosts_json)?
                };

                println!("{output}");
            }
            OutputFormat::Pretty => {
                #[cfg(feature = "colored-output")]
                let title = if self.config.colored_output {
                    "Supported Hosts:".green().bold().to_string()
                } else {
                    "Supported Hosts:".to_string()
                };

                #[cfg(not(feature = "colored-output"))]
                let title = "Supported Hosts:".to_string();

                println!("{title}");

                for name in hosts {
                    #[cfg(feature = "colored-output")]
                    {
                        if self.config.colored_output {
                            println!("  {}", name.cyan().bold());
                        } else {
                            println!("  {name}");
                        }
                    }

                    #[cfg(not(feature = "colored-output"))]
                    {
                        println!("  {name}");
                    }
                }
            }
        }

        Ok(())
    }

    fn create_progress_bar(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(message.to_string());
        pb
    }
}

/// Parses `Name: value` pairs into a header map.
fn parse_headers(raw: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for header in raw {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| CliError::invalid_input(format!("Header must be 'Name: value': {header}")))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| CliError::invalid_input(format!("Invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| CliError::invalid_input(format!("Invalid header value for {name}: {e}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::REFERER;

    #[test]
    fn headers_are_parsed() {
        let headers = parse_headers(&[
            "Referer: https://flixhq.to/watch".to_string(),
            "X-Token:abc".to_string(),
        ])
        .unwrap();
        assert_eq!(headers[REFERER], "https://flixhq.to/watch");
        assert_eq!(headers["x-token"], "abc");

        assert!(matches!(
            parse_headers(&["no separator".to_string()]),
            Err(CliError::InvalidInput(_))
        ));
        assert!(parse_headers(&["bad name: x".to_string()]).is_err());
    }

    #[test]
    fn cache_key_defaults() {
        let executor = CommandExecutor::new(AppConfig::default(), ClientConfig::default()).unwrap();
        let url = Url::parse("https://mixdrop.co/e/abc123").unwrap();

        let key = executor
            .cache_key(&url, "MixDrop", &ExtractOptions::default())
            .unwrap();
        assert_eq!(key.to_string(), "mixdrop::abc123-null:null");

        let options = ExtractOptions {
            provider: Some("flixhq"),
            film: Some("tv/watch-the-flash-39535"),
            season: Some(1),
            episode: Some(1),
            ..ExtractOptions::default()
        };
        let key = executor.cache_key(&url, "MixDrop", &options).unwrap();
        assert_eq!(key.to_string(), "flixhq::tv/watch-the-flash-39535-1:1");

        let options = ExtractOptions {
            provider: Some("bad:id"),
            ..ExtractOptions::default()
        };
        assert!(matches!(
            executor.cache_key(&url, "MixDrop", &options),
            Err(CliError::InvalidInput(_))
        ));
    }
}
