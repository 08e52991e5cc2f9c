use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use link_cache::{CacheKey, CachedLinks};
use link_extractors::LoadStatus;
use serde::Serialize;
use std::io::Write;

/// Everything printed for one extraction.
#[derive(Debug, Serialize)]
pub struct ExtractionReport<'a> {
    pub key: &'a CacheKey,
    pub extractor: &'a str,
    pub status: &'a LoadStatus,
    pub links: &'a CachedLinks,
}

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_report(&self, report: &ExtractionReport<'_>, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_pretty(report)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)? + "\n"),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(report)? + "\n"),
        }
    }

    fn format_pretty(&self, report: &ExtractionReport<'_>) -> String {
        let links = report.links;
        let mut output = String::new();

        output.push_str(&self.colorize("Cache Entry:", &Color::Green, true));
        output.push('\n');
        self.push_field(&mut output, "Key", &report.key.to_string(), &Color::Cyan);
        self.push_field(&mut output, "Extractor", report.extractor, &Color::Cyan);
        self.push_field(&mut output, "Watch ID", &links.watch_id, &Color::Cyan);
        if let Some(thumbnail) = &links.thumbnail {
            self.push_field(&mut output, "Thumbnail", thumbnail, &Color::Blue);
        }
        self.push_field(&mut output, "Status", &describe_status(report.status), &Color::Cyan);

        output.push('\n');
        output.push_str(&self.colorize(
            &format!("Streams ({}):", links.stream_count()),
            &Color::Green,
            true,
        ));
        output.push('\n');
        for (index, stream) in links.streams.iter().enumerate() {
            output.push_str(&format!(
                "  [{}] {} ({})\n      {}\n",
                index + 1,
                self.colorize(&stream.name, &Color::Yellow, false),
                stream.format,
                self.colorize(&stream.url, &Color::Blue, false)
            ));
            if let Some(headers) = stream.required_headers() {
                for (name, value) in headers {
                    output.push_str(&format!("      {name}: {value}\n"));
                }
            }
            if let Some(expires_on) = stream.expires_on() {
                output.push_str(&format!("      expires: {}\n", expires_on.to_rfc3339()));
            }
        }

        if !links.subtitles.is_empty() {
            output.push('\n');
            output.push_str(&self.colorize(
                &format!("Subtitles ({}):", links.subtitles.len()),
                &Color::Green,
                true,
            ));
            output.push('\n');
            for subtitle in &links.subtitles {
                output.push_str(&format!(
                    "  {}: {}\n",
                    self.colorize(&subtitle.language, &Color::Yellow, false),
                    self.colorize(&subtitle.url, &Color::Blue, false)
                ));
            }
        }

        output
    }

    fn push_field(&self, output: &mut String, name: &str, value: &str, color: &Color) {
        output.push_str(&format!(
            "  {}: {}\n",
            self.colorize(name, &Color::Yellow, false),
            self.colorize(value, color, false)
        ));
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (self.colored, color, bold);
            text.to_string()
        }
    }
}

fn describe_status(status: &LoadStatus) -> String {
    match status {
        LoadStatus::Success { streams, subtitles } => {
            format!("ok ({streams} new streams, {subtitles} new subtitles)")
        }
        LoadStatus::NotFound => "source not found".to_string(),
        LoadStatus::Failed { kind, message } => format!("failed ({kind:?}): {message}"),
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
}

pub fn write_output(content: &str, output_file: Option<&std::path::Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => {
            print!("{content}");
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}
