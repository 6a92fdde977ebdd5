use crate::config::Overrides;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Stream blog posts from a generation endpoint", long_about = None)]
pub struct Cli {
    /// SQLite file holding settings, history and the last post
    #[arg(long, global = true, env = "BLOG_WRITER_DB")]
    pub db: Option<PathBuf>,

    /// Generation endpoint
    #[arg(long, global = true, env = "BLOG_API_URL")]
    pub api_url: Option<String>,

    #[arg(long, global = true, env = "PEXELS_SEARCH_URL")]
    pub image_search_url: Option<String>,

    #[arg(long, global = true, env = "PEXELS_API_KEY", hide_env_values = true)]
    pub pexels_api_key: Option<String>,

    /// Program used to turn HTML into PDF
    #[arg(long, global = true, env = "BLOG_PDF_RENDERER")]
    pub pdf_renderer: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            api_url: self.api_url.clone(),
            image_search_url: self.image_search_url.clone(),
            pexels_api_key: self.pexels_api_key.clone(),
            pdf_renderer: self.pdf_renderer.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a blog post; Ctrl-C cancels
    Generate {
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
        /// Skip keyword image lookups
        #[arg(long)]
        no_images: bool,
    },
    /// List recent prompts
    History {
        /// Re-run the Nth entry (1 = most recent)
        #[arg(long, value_name = "N")]
        rerun: Option<usize>,
    },
    /// Print the last generated post
    Last,
    Export {
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print share links for the last post
    Share {
        #[arg(short, long)]
        platform: Option<String>,
    },
    /// Copy the last post to the clipboard
    Copy,
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Markdown,
    Html,
    Pdf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_joins_words_and_reads_flags() {
        let cli = Cli::try_parse_from([
            "blog-writer",
            "--api-url",
            "http://localhost:9/generate",
            "generate",
            "Write",
            "about",
            "cats",
            "--no-images",
        ])
        .unwrap();

        assert_eq!(cli.overrides().api_url.as_deref(), Some("http://localhost:9/generate"));
        match cli.command {
            Commands::Generate { prompt, no_images } => {
                assert_eq!(prompt.join(" "), "Write about cats");
                assert!(no_images);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn export_defaults_to_markdown() {
        let cli = Cli::try_parse_from(["blog-writer", "export"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export { format: ExportFormat::Markdown, output: None }
        ));
    }
}
