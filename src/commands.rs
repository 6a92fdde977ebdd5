// Handles CLI command definitions

use crate::blog_api::{self, BlogClient, GeneratedPost, StreamOutcome};
use crate::cli::{ConfigCommands, ExportFormat};
use crate::config::{self, ConfigKey, Overrides, Settings};
use crate::db::{self, DbConn};
use crate::error::{BlogError, Result};
use crate::export;
use crate::image_search::ImageSearchClient;
use crate::session::{self, SharedState};
use crate::share::{self, SharePlatform};

use reqwest::Client;
use std::io::Write;
use std::path::Path;

pub struct AppContext {
    pub db: DbConn,
    pub state: SharedState,
    pub settings: Settings,
    client: Client,
}

impl AppContext {
    pub async fn load(db: DbConn, overrides: &Overrides) -> Result<Self> {
        let (settings, last_result) = {
            let conn = db.lock().await;
            (Settings::resolve(&conn, overrides)?, db::load_last_result(&conn)?)
        };

        Ok(Self {
            db,
            state: session::new_shared_state(last_result),
            settings,
            client: Client::new(),
        })
    }

    fn blog_client(&self, with_images: bool) -> BlogClient {
        let api = BlogClient::new(self.client.clone(), &self.settings.api_url);
        if !with_images {
            return api;
        }
        api.with_image_search(ImageSearchClient::new(
            self.client.clone(),
            &self.settings.image_search_url,
            self.settings.pexels_api_key.clone(),
        ))
    }

    async fn last_post(&self) -> Result<GeneratedPost> {
        self.state
            .lock()
            .await
            .last_result()
            .cloned()
            .ok_or(BlogError::NoResult)
    }
}

pub async fn generate(ctx: &AppContext, prompt: &str, with_images: bool) -> Result<()> {
    let api = ctx.blog_client(with_images);

    // Ctrl-C aborts the session instead of killing the process
    let abort_state = ctx.state.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            session::abort_generation(&abort_state).await;
        }
    });

    let mut stdout = std::io::stdout();
    let outcome = blog_api::process_blog_generation(&api, prompt, &ctx.state, &ctx.db, |chunk| {
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    })
    .await;
    ctrl_c.abort();
    println!();

    match outcome? {
        StreamOutcome::Completed(post) => {
            for url in &post.images {
                println!("🖼  {}", url);
            }
            println!("✅ Saved \"{}\"", post.prompt);
        }
        StreamOutcome::Aborted => {
            println!("{}", ctx.state.lock().await.display());
        }
    }

    Ok(())
}

pub async fn history(ctx: &AppContext, rerun: Option<usize>, with_images: bool) -> Result<()> {
    let entries = db::load_history(&*ctx.db.lock().await)?;

    let Some(n) = rerun else {
        if entries.is_empty() {
            println!("No prompts yet.");
        }
        for (i, entry) in entries.iter().enumerate() {
            println!("{:>2}. {}  ({})", i + 1, entry.prompt, entry.timestamp);
        }
        return Ok(());
    };

    let entry = n
        .checked_sub(1)
        .and_then(|i| entries.get(i))
        .ok_or_else(|| BlogError::Config(format!("history has no entry {}", n)))?;
    generate(ctx, &entry.prompt, with_images).await
}

pub async fn last(ctx: &AppContext) -> Result<()> {
    let post = ctx.last_post().await?;
    println!("{}", export::to_markdown(&post).trim_end());
    Ok(())
}

pub async fn export(ctx: &AppContext, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let post = ctx.last_post().await?;

    let rendered = match format {
        ExportFormat::Markdown => export::to_markdown(&post),
        ExportFormat::Html => export::render_html(&post),
        ExportFormat::Pdf => {
            let path = export::export_pdf(&post, &ctx.settings.pdf, output).await?;
            println!("📄 Wrote {}", path.display());
            return Ok(());
        }
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("📄 Wrote {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

pub async fn share(ctx: &AppContext, platform: Option<&str>) -> Result<()> {
    let post = ctx.last_post().await?;

    let wanted = match platform {
        Some(name) => Some(
            SharePlatform::from_name(name)
                .ok_or_else(|| BlogError::Config(format!("unknown share platform '{}'", name)))?,
        ),
        None => None,
    };

    for (platform, url) in share::share_links(&post)? {
        if wanted.map_or(true, |w| w == platform) {
            println!("{:<9} {}", platform.name(), url);
        }
    }
    Ok(())
}

pub async fn copy(ctx: &AppContext) -> Result<()> {
    let post = ctx.last_post().await?;
    let tool = export::copy_to_clipboard(&export::to_markdown(&post)).await?;
    println!("📋 Copied to clipboard ({})", tool);
    Ok(())
}

pub async fn config(db: &DbConn, command: ConfigCommands) -> Result<()> {
    let conn = db.lock().await;

    match command {
        ConfigCommands::Get { key } => {
            let key = ConfigKey::parse(&key)?;
            match config::display_value(&conn, key)? {
                Some(value) => println!("{}", value),
                None => println!("{} is not set", key.as_str()),
            }
        }
        ConfigCommands::Set { key, value } => config::set_value(&conn, &key, &value)?,
        ConfigCommands::Unset { key } => config::unset_value(&conn, &key)?,
        ConfigCommands::List => {
            for key in ConfigKey::ALL {
                let value = config::display_value(&conn, key)?;
                println!("{:<17} {}", key.as_str(), value.as_deref().unwrap_or("-"));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreadable_last_result_does_not_block_startup() {
        let db_conn = db::open_in_memory();
        db::update_config_value(&*db_conn.lock().await, db::LAST_RESULT_KEY, "{oops").unwrap();

        let ctx = AppContext::load(db_conn, &Overrides::default()).await.unwrap();
        assert!(matches!(ctx.last_post().await, Err(BlogError::NoResult)));
    }
}
