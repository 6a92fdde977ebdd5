//! Export of a finished post.
//!
//! Markdown and HTML are produced in-process. PDF output is delegated to an
//! external renderer (`wkhtmltopdf` by default) fed with the rendered HTML,
//! and clipboard copies go through whichever platform utility is installed.

use crate::blog_api::GeneratedPost;
use crate::config::DEFAULT_PDF_RENDERER;
use crate::error::{BlogError, Result};

use pulldown_cmark::{html, Options, Parser};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageUnit {
    Millimeter,
    Inch,
}

impl PageUnit {
    fn suffix(&self) -> &'static str {
        match self {
            PageUnit::Millimeter => "mm",
            PageUnit::Inch => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    A4,
    Letter,
}

impl PageFormat {
    fn as_str(&self) -> &'static str {
        match self {
            PageFormat::A4 => "A4",
            PageFormat::Letter => "Letter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        }
    }
}

/// Page setup handed to the PDF renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub margin: f32,
    pub unit: PageUnit,
    pub format: PageFormat,
    pub orientation: Orientation,
    /// Raster scale; the renderer receives `96 * scale` DPI.
    pub scale: f32,
    pub filename: String,
    pub renderer: String,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            margin: 0.5,
            unit: PageUnit::Inch,
            format: PageFormat::Letter,
            orientation: Orientation::Portrait,
            scale: 2.0,
            filename: "blog.pdf".to_string(),
            renderer: DEFAULT_PDF_RENDERER.to_string(),
        }
    }
}

impl PdfOptions {
    fn renderer_args(&self) -> Vec<String> {
        let margin = format!("{}{}", self.margin, self.unit.suffix());
        let dpi = ((96.0 * self.scale).round() as u32).max(1);

        let mut args = vec![
            "--quiet".to_string(),
            "--enable-local-file-access".to_string(),
            "--page-size".to_string(),
            self.format.as_str().to_string(),
            "--orientation".to_string(),
            self.orientation.as_str().to_string(),
            "--dpi".to_string(),
            dpi.to_string(),
        ];
        for side in ["top", "bottom", "left", "right"] {
            args.push(format!("--margin-{side}"));
            args.push(margin.clone());
        }
        args
    }
}

/// Title used for documents and share links: the first heading, else the prompt.
pub fn post_title(post: &GeneratedPost) -> String {
    post.text
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| post.prompt.clone())
}

pub fn to_markdown(post: &GeneratedPost) -> String {
    let mut out = post.text.clone();
    for (i, url) in post.images.iter().enumerate() {
        out.push_str(&format!("\n\n![Image {}]({})", i + 1, url));
    }
    out.push('\n');
    out
}

pub fn render_html(post: &GeneratedPost) -> String {
    let markdown = to_markdown(post);
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut body = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut body, Parser::new_ext(&markdown, options));

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>body{{font-family:sans-serif;line-height:1.6;max-width:48rem;margin:auto}}\
         img{{max-width:100%}}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(&post_title(post)),
        body
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders `post` to a PDF at `output` (or `options.filename`).
pub async fn export_pdf(
    post: &GeneratedPost,
    options: &PdfOptions,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&options.filename));

    let mut page = tempfile::Builder::new()
        .prefix("blog-writer-")
        .suffix(".html")
        .tempfile()?;
    page.write_all(render_html(post).as_bytes())?;
    page.flush()?;

    tracing::debug!("rendering {} with {}", output.display(), options.renderer);
    let status = Command::new(&options.renderer)
        .args(options.renderer_args())
        .arg(page.path())
        .arg(&output)
        .stdin(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => Ok(output),
        Ok(status) => Err(BlogError::ExportUnavailable(format!(
            "{} exited with {}",
            options.renderer, status
        ))),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(BlogError::ExportUnavailable(format!(
            "PDF renderer '{}' is not installed",
            options.renderer
        ))),
        Err(e) => Err(BlogError::Io(e)),
    }
}

type ClipboardTool = (&'static str, &'static [&'static str]);

const CLIPBOARD_TOOLS: &[ClipboardTool] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
    ("clip", &[]),
];

/// Copies `text` to the system clipboard, returning the utility that took it.
pub async fn copy_to_clipboard(text: &str) -> Result<&'static str> {
    copy_with(CLIPBOARD_TOOLS, text).await
}

async fn copy_with(tools: &[ClipboardTool], text: &str) -> Result<&'static str> {
    let mut last_failure = None;

    for &(program, args) in tools {
        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                last_failure = Some(format!("{}: {}", program, e));
                continue;
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()).await {
                last_failure = Some(format!("{}: {}", program, e));
                let _ = child.kill().await;
                continue;
            }
        }

        let status = child.wait().await?;
        if status.success() {
            return Ok(program);
        }
        tracing::debug!("{} exited with {}", program, status);
        last_failure = Some(format!("{} exited with {}", program, status));
    }

    Err(BlogError::ClipboardDenied(
        last_failure.unwrap_or_else(|| "no clipboard utility available".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> GeneratedPost {
        GeneratedPost {
            prompt: "Write about cats".into(),
            text: "# Cats & Kittens\n\nCats are **great**.".into(),
            images: vec!["http://x/1.jpg".into(), "http://x/2.jpg".into()],
            completed_at: "2024-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn title_prefers_first_heading() {
        assert_eq!(post_title(&post()), "Cats & Kittens");

        let untitled = GeneratedPost {
            text: "No heading here.".into(),
            ..post()
        };
        assert_eq!(post_title(&untitled), "Write about cats");
    }

    #[test]
    fn markdown_appends_images() {
        assert_eq!(
            to_markdown(&post()),
            "# Cats & Kittens\n\nCats are **great**.\n\n![Image 1](http://x/1.jpg)\n\n![Image 2](http://x/2.jpg)\n"
        );
    }

    #[test]
    fn html_document_contains_rendered_body() {
        let html = render_html(&post());

        assert!(html.contains("<title>Cats &amp; Kittens</title>"));
        assert!(html.contains("<strong>great</strong>"));
        assert!(html.contains("<img src=\"http://x/2.jpg\" alt=\"Image 2\""));
    }

    #[test]
    fn renderer_args_follow_page_setup() {
        let args = PdfOptions::default().renderer_args().join(" ");

        assert!(args.contains("--page-size Letter"));
        assert!(args.contains("--orientation Portrait"));
        assert!(args.contains("--dpi 192"));
        assert!(args.contains("--margin-left 0.5in"));

        let a4 = PdfOptions {
            unit: PageUnit::Millimeter,
            margin: 10.0,
            format: PageFormat::A4,
            ..PdfOptions::default()
        };
        let args = a4.renderer_args().join(" ");
        assert!(args.contains("--page-size A4"));
        assert!(args.contains("--margin-top 10mm"));
    }

    #[tokio::test]
    async fn missing_renderer_is_export_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let options = PdfOptions {
            renderer: "blog-writer-no-such-renderer".into(),
            ..PdfOptions::default()
        };

        let err = export_pdf(&post(), &options, Some(&dir.path().join("out.pdf")))
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::ExportUnavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn renderer_receives_page_and_output_paths() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-renderer");
        std::fs::write(
            &script,
            "#!/bin/sh\nfor last; do :; done\necho \"$@\" > \"$last\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let options = PdfOptions {
            renderer: script.to_string_lossy().into_owned(),
            ..PdfOptions::default()
        };
        let output = dir.path().join("post.pdf");

        let written = export_pdf(&post(), &options, Some(&output)).await.unwrap();
        assert_eq!(written, output);

        let recorded = std::fs::read_to_string(&output).unwrap();
        assert!(recorded.contains("--page-size Letter"));
        assert!(recorded.contains(".html"));
        assert!(recorded.trim_end().ends_with("post.pdf"));
    }

    #[tokio::test]
    async fn no_clipboard_tool_is_denied() {
        const MISSING: &[ClipboardTool] = &[("blog-writer-no-such-clipboard", &[])];

        let err = copy_with(MISSING, "hello").await.unwrap_err();
        assert!(matches!(err, BlogError::ClipboardDenied(ref m) if m == "no clipboard utility available"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn first_working_clipboard_tool_wins() {
        const FALLBACKS: &[ClipboardTool] =
            &[("blog-writer-missing", &[]), ("false", &[]), ("cat", &[])];
        const FAILING: &[ClipboardTool] = &[("false", &[])];

        assert_eq!(copy_with(FALLBACKS, "hello").await.unwrap(), "cat");

        let err = copy_with(FAILING, "hello").await.unwrap_err();
        assert!(matches!(err, BlogError::ClipboardDenied(ref m) if m.starts_with("false")));
    }
}
