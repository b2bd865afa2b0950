//! Landing page assembly
//!
//! The model writes only the three in-page sections. Head, navbar, styles and
//! footer are fixed here so every generated page shares the same shell.

use foundry_core::{AudiencePersona, CoreMessaging};
use foundry_llm::{Extractor, LlmResult};
use std::collections::BTreeMap;

const SECTION_IDS: [&str; 3] = ["id=\"home\"", "id=\"about\"", "id=\"contact\""];

const SECTIONS_SYSTEM: &str = "Output ONLY raw HTML: three <section> tags with ids home, about, \
                               contact. No <html>/<head>/<body>/<style> wrappers. No buttons, \
                               forms or inputs. No commentary.";

/// Inputs the section prompt needs; shared by the web node and regeneration.
#[derive(Clone, Debug, Default)]
pub struct LandingInputs {
    pub topic: String,
    pub company_name: String,
    pub audience_persona: Option<AudiencePersona>,
    pub core_messaging: Option<CoreMessaging>,
    pub generated_assets: BTreeMap<String, String>,
}

/// `company_name`, else `topic`, else "Company".
pub fn display_company(company_name: Option<&str>, topic: Option<&str>) -> String {
    [company_name, topic]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Company")
        .to_string()
}

/// Generate the sections and wrap them in the page shell.
pub async fn generate_landing_page(llm: &Extractor, inputs: &LandingInputs, year: i32) -> LlmResult<String> {
    let persona = inputs
        .audience_persona
        .as_ref()
        .map(|p| serde_json::to_string(p).unwrap_or_default())
        .unwrap_or_else(|| "{}".into());
    let messaging = inputs
        .core_messaging
        .as_ref()
        .map(|m| serde_json::to_string(m).unwrap_or_default())
        .unwrap_or_else(|| "{}".into());
    let assets = serde_json::to_string(&inputs.generated_assets).unwrap_or_default();

    let user = format!(
        "Topic: {}\nCompany: {}\nPersona: {persona}\nMessaging: {messaging}\nImages: {assets}\n\n\
         Generate 3 sections:\n\
         <section id=\"home\">Hero with webinar_banner_url image + value proposition</section>\n\
         <section id=\"about\">Problem/Solution based on pain_point</section>\n\
         <section id=\"contact\">Who is this for (descriptive only)</section>",
        inputs.topic, inputs.company_name
    );

    let raw = llm.generate(SECTIONS_SYSTEM, &user).await?;
    Ok(build_landing_page(&inputs.company_name, extract_sections(&raw), year))
}

/// Pull the section markup out of a model reply. Code fences are stripped;
/// a reply with all three sections is kept whole; a full document is cut
/// down to its `<body>` contents.
pub fn extract_sections(raw: &str) -> &str {
    let text = foundry_llm::strip_code_fences(raw).trim();
    if text.is_empty() {
        return text;
    }

    let lower = text.to_ascii_lowercase();
    if lower.contains("<section") && SECTION_IDS.iter().all(|id| lower.contains(id)) {
        return text;
    }

    if let Some(open) = lower.find("<body") {
        if let (Some(tag_end), Some(close)) = (lower[open..].find('>'), lower.rfind("</body>")) {
            let start = open + tag_end + 1;
            if close > start {
                return text[start..close].trim();
            }
        }
    }
    text
}

pub fn build_landing_page(company_name: &str, sections_html: &str, year: i32) -> String {
    let company = match company_name.trim() {
        "" => "Company",
        name => name,
    };
    let footer = format!("© {company}.{year}.generated with PROMETHEON.");

    format!(
        r##"<!doctype html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{company}</title>
    <style>
        :root {{
            --bg: #0b1020;
            --panel: rgba(255,255,255,0.06);
            --text: rgba(255,255,255,0.92);
            --muted: rgba(255,255,255,0.70);
            --border: rgba(255,255,255,0.12);
            --max: 1040px;
        }}
        * {{ box-sizing: border-box; }}
        html {{ scroll-behavior: smooth; }}
        body {{
            margin: 0;
            font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial;
            background: radial-gradient(1200px 700px at 20% 0%, rgba(139,92,246,0.28), transparent 60%),
                        radial-gradient(900px 600px at 90% 10%, rgba(236,72,153,0.20), transparent 55%),
                        var(--bg);
            color: var(--text);
            line-height: 1.55;
        }}
        a {{ color: inherit; text-decoration: none; }}
        .container {{ max-width: var(--max); margin: 0 auto; padding: 0 20px; }}
        .nav {{
            position: sticky;
            top: 0;
            z-index: 50;
            backdrop-filter: blur(10px);
            background: rgba(11,16,32,0.72);
            border-bottom: 1px solid var(--border);
        }}
        .nav-inner {{ display: flex; align-items: center; justify-content: space-between; height: 64px; }}
        .brand {{ font-weight: 800; }}
        .links {{ display: flex; gap: 16px; }}
        .links a {{ padding: 8px 10px; border-radius: 10px; color: var(--muted); }}
        .links a:hover {{ background: rgba(255,255,255,0.06); color: var(--text); }}
        main {{ padding: 24px 0 44px; }}
        section {{
            scroll-margin-top: 84px;
            margin: 18px 0;
            padding: 28px;
            border: 1px solid var(--border);
            border-radius: 18px;
            background: var(--panel);
            overflow: hidden;
        }}
        h1,h2,h3 {{ margin: 0 0 12px; line-height: 1.15; }}
        p {{ margin: 0 0 12px; color: var(--muted); }}
        img {{ max-width: 100%; border-radius: 14px; border: 1px solid var(--border); display: block; }}
        .footer {{
            border-top: 1px solid var(--border);
            color: rgba(255,255,255,0.78);
            text-align: center;
            padding: 18px 12px;
        }}
    </style>
</head>
<body>
    <header class="nav">
        <div class="container nav-inner">
            <div class="brand">{company}</div>
            <nav class="links" aria-label="Primary">
                <a href="#home">Home</a>
                <a href="#contact">Contact</a>
                <a href="#about">About</a>
            </nav>
        </div>
    </header>

    <main class="container">
        {sections_html}
    </main>

    <footer class="footer">{footer}</footer>
</body>
</html>"##
    )
}
