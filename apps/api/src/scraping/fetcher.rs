use reqwest::Client;
use scraper::{Html, Node, Selector};
use thiserror::Error;
use tracing::{info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    Status { url: String, status: u16 },
}

/// A fetched page reduced to its visible text.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub title: Option<String>,
    pub text: String,
}

pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }

    /// GETs `url` and returns the page's visible text.
    pub async fn fetch(&self, url: &str) -> Result<PageContent, FetchError> {
        info!("Fetching job page: {}", url);

        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(transport)?;
        let content = extract_page_content(&html);

        if content.text.is_empty() {
            warn!("Page {} has no visible text", url);
        }
        info!(
            "Fetched page {:?} ({} chars of text)",
            content.title.as_deref().unwrap_or("untitled"),
            content.text.len()
        );

        Ok(content)
    }
}

/// Collects the visible text nodes of an HTML document, one per line.
pub fn extract_page_content(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let title = Selector::parse("title").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    });

    let lines: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                });
                (!hidden).then(|| text.trim())
            }
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect();

    PageContent {
        title,
        text: lines.join("\n"),
    }
}
