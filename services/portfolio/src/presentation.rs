//! Portfolio page rendering
//!
//! The [`Presenter`] seam turns a portfolio plus the site settings into a
//! page for a numeric template id. [`HtmlPresenter`] is a minimal built-in
//! implementation with one layout and six colour themes.

use std::fmt::Write as _;
use thiserror::Error;

use crate::models::{Portfolio, SiteSettings};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template {0} does not exist")]
    UnknownTemplate(i32),

    #[error("{0}")]
    Template(String),
}

/// Renders a portfolio with the template chosen by id
pub trait Presenter: Send + Sync {
    fn render(
        &self,
        template_id: i32,
        portfolio: &Portfolio,
        settings: &SiteSettings,
    ) -> Result<String, RenderError>;
}

/// Ids the built-in presenter can render
pub const TEMPLATE_IDS: std::ops::RangeInclusive<i32> = 1..=6;

struct Theme {
    background: &'static str,
    foreground: &'static str,
    accent: &'static str,
}

const THEMES: [Theme; 6] = [
    Theme { background: "#ffffff", foreground: "#222222", accent: "#0d6efd" },
    Theme { background: "#101418", foreground: "#e6e6e6", accent: "#4fd1c5" },
    Theme { background: "#fdf6e3", foreground: "#586e75", accent: "#b58900" },
    Theme { background: "#f4f1fb", foreground: "#2d2440", accent: "#7c3aed" },
    Theme { background: "#eef6f0", foreground: "#1d3b2a", accent: "#2f855a" },
    Theme { background: "#1a1a2e", foreground: "#f5f5f5", accent: "#e94560" },
];

/// Escape text for HTML element and attribute content
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn write(html: &mut String, args: std::fmt::Arguments<'_>) -> Result<(), RenderError> {
    html.write_fmt(args)
        .map_err(|err| RenderError::Template(err.to_string()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPresenter;

impl Presenter for HtmlPresenter {
    fn render(
        &self,
        template_id: i32,
        portfolio: &Portfolio,
        settings: &SiteSettings,
    ) -> Result<String, RenderError> {
        if !TEMPLATE_IDS.contains(&template_id) {
            return Err(RenderError::UnknownTemplate(template_id));
        }
        let theme = &THEMES[(template_id - 1) as usize];
        let e = escape_html;

        let mut html = String::new();

        write(
            &mut html,
            format_args!(
                "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
                 <title>{name}</title>\n<style>body{{background:{bg};color:{fg};font-family:sans-serif;margin:2rem}}\
                 a{{color:{accent}}}h1,h2{{color:{accent}}}</style>\n</head>\n\
                 <body class=\"template-{id}\">\n<header>\n<img src=\"{pic}\" alt=\"{name}\" width=\"120\">\n\
                 <h1>{name}</h1>\n<p>{title} at {company}</p>\n</header>\n\
                 <section id=\"about\"><h2>About</h2><p>{bio}</p>\
                 <p><a href=\"{resume}\">Résumé</a></p></section>\n",
                name = e(&portfolio.full_name),
                bg = theme.background,
                fg = theme.foreground,
                accent = theme.accent,
                id = template_id,
                pic = e(&portfolio.profile_pic),
                title = e(&portfolio.job_title),
                company = e(&portfolio.company_name),
                bio = e(&portfolio.bio),
                resume = e(&portfolio.resume_file),
            ),
        )?;

        write(&mut html, format_args!("<section id=\"skills\"><h2>Skills</h2><ul>"))?;
        for skill in portfolio.skill_list() {
            write(&mut html, format_args!("<li>{}</li>", e(&skill)))?;
        }
        write(&mut html, format_args!("</ul></section>\n<section id=\"projects\"><h2>Projects</h2>\n"))?;

        for project in portfolio.projects() {
            write(
                &mut html,
                format_args!(
                    "<article><h3><a href=\"{}\">{}</a></h3><p>{}</p></article>\n",
                    e(project.link),
                    e(project.title),
                    e(project.desc)
                ),
            )?;
        }

        write(
            &mut html,
            format_args!(
                "</section>\n<section id=\"contact\"><h2>Contact</h2>\
                 <p><a href=\"mailto:{email}\">{email}</a> &middot; {phone}</p>\
                 <p><a href=\"{linkedin}\">LinkedIn</a> &middot; <a href=\"{github}\">GitHub</a> \
                 &middot; <a href=\"{twitter}\">Twitter</a></p></section>\n\
                 <footer><p>{copyright}</p><p>{footer}</p></footer>\n</body>\n</html>\n",
                email = e(&portfolio.email),
                phone = e(&portfolio.phone),
                linkedin = e(&portfolio.linkedin_url),
                github = e(&portfolio.github_url),
                twitter = e(&portfolio.twitter_url),
                copyright = e(&settings.copyright_text),
                footer = e(&settings.footer_text),
            ),
        )?;

        Ok(html)
    }
}
