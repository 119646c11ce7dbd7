use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::str::FromStr;

/// A repository as GitHub's search returns it.
///
/// Serialized field names follow GitHub's (`stargazers_count`, `html_url`),
/// which is also the shape the front end posts when bookmarking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    #[serde(rename = "html_url")]
    pub url: String,
    #[serde(rename = "stargazers_count")]
    pub stars: u32,
    #[serde(rename = "forks_count")]
    pub forks: u32,
    #[serde(rename = "open_issues_count")]
    pub open_issues: u32,
    pub language: Option<String>,
}

impl Repository {
    /// Language for display; unset and empty both read as "Unknown"
    pub fn language_or_unknown(&self) -> &str {
        match self.language.as_deref() {
            Some(lang) if !lang.is_empty() => lang,
            _ => crate::analytics::UNKNOWN_LANGUAGE,
        }
    }
}

/// A bookmarked repository exactly as the client sent it.
///
/// The JSON object is stored and served back untouched, so fields nothing
/// here models (`owner`, `topics`, ...) survive. `view()` is a lenient typed
/// reading of it: missing or oddly typed fields read as defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoSnapshot {
    raw: Map<String, Value>,
    view: Repository,
}

impl RepoSnapshot {
    /// `None` unless `value` is a JSON object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(raw) => {
                let view = lenient_view(&raw);
                Some(Self { raw, view })
            }
            _ => None,
        }
    }

    pub fn view(&self) -> &Repository {
        &self.view
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl From<Repository> for RepoSnapshot {
    fn from(repo: Repository) -> Self {
        let raw = match serde_json::to_value(&repo) {
            Ok(Value::Object(raw)) => raw,
            _ => Map::new(),
        };
        Self { raw, view: repo }
    }
}

impl Serialize for RepoSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RepoSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value)
            .ok_or_else(|| de::Error::custom("repository snapshot must be a JSON object"))
    }
}

fn lenient_view(raw: &Map<String, Value>) -> Repository {
    let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
    let count = |key: &str| {
        raw.get(key)
            .and_then(Value::as_u64)
            .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
    };

    Repository {
        id: raw.get("id").and_then(Value::as_u64).unwrap_or_default(),
        name: text("name").unwrap_or_default(),
        full_name: text("full_name").unwrap_or_default(),
        description: text("description"),
        url: text("html_url").unwrap_or_default(),
        stars: count("stargazers_count"),
        forks: count("forks_count"),
        open_issues: count("open_issues_count"),
        language: text("language"),
    }
}

/// A user's saved repository snapshot
pub type Bookmark = repomark_store::StoredBookmark<RepoSnapshot>;

/// Upstream sort order. Results always come back descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Stars,
    Updated,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Stars => "stars",
            SortKey::Updated => "updated",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Stars => "Sort by Stars",
            SortKey::Updated => "Recently Updated",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            SortKey::Stars => SortKey::Updated,
            SortKey::Updated => SortKey::Stars,
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stars" => Ok(SortKey::Stars),
            "updated" => Ok(SortKey::Updated),
            other => Err(crate::Error::ValidationError(format!(
                "Unknown sort key '{}', expected 'stars' or 'updated'",
                other
            ))),
        }
    }
}

/// `All` leaves the language qualifier out of the upstream query
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum LanguageFilter {
    #[default]
    All,
    Language(String),
}

impl LanguageFilter {
    pub fn qualifier(&self) -> Option<&str> {
        match self {
            LanguageFilter::All => None,
            LanguageFilter::Language(lang) => Some(lang),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            LanguageFilter::All => "All Languages",
            LanguageFilter::Language(lang) => lang,
        }
    }
}

impl std::fmt::Display for LanguageFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageFilter::All => f.write_str("all"),
            LanguageFilter::Language(lang) => f.write_str(lang),
        }
    }
}

impl FromStr for LanguageFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(LanguageFilter::All)
        } else {
            Ok(LanguageFilter::Language(s.to_string()))
        }
    }
}

/// Languages offered by the search controls, "all" first
pub const LANGUAGE_CHOICES: &[&str] = &[
    "all",
    "JavaScript",
    "Python",
    "Java",
    "C++",
    "TypeScript",
    "Go",
    "C#",
    "PHP",
    "Ruby",
];

/// One page of a repository search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub language: LanguageFilter,
    pub sort: SortKey,
    /// 1-based
    pub page: u32,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            language: LanguageFilter::All,
            sort: SortKey::default(),
            page: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_uses_github_field_names() {
        let json = r#"{
            "id": 1,
            "name": "ripgrep",
            "full_name": "BurntSushi/ripgrep",
            "description": "grep, but fast",
            "html_url": "https://github.com/BurntSushi/ripgrep",
            "stargazers_count": 45000,
            "forks_count": 1900,
            "open_issues_count": 80,
            "language": "Rust",
            "watchers": 12
        }"#;
        let repo: Repository = serde_json::from_str(json).unwrap();
        assert_eq!(repo.stars, 45000);
        assert_eq!(repo.url, "https://github.com/BurntSushi/ripgrep");

        let back = serde_json::to_value(&repo).unwrap();
        assert_eq!(back["stargazers_count"], 45000);
        assert_eq!(back["open_issues_count"], 80);
    }

    #[test]
    fn test_empty_object_is_a_repository() {
        let repo: Repository = serde_json::from_str("{}").unwrap();
        assert_eq!(repo, Repository::default());
        assert_eq!(repo.language_or_unknown(), "Unknown");
    }

    #[test]
    fn test_snapshot_keeps_unmodelled_fields() {
        let sent = serde_json::json!({
            "id": 1,
            "name": "bat",
            "owner": { "login": "sharkdp" },
            "topics": ["cli"],
            "stargazers_count": 5
        });
        let snapshot: RepoSnapshot = serde_json::from_value(sent.clone()).unwrap();

        assert_eq!(serde_json::to_value(&snapshot).unwrap(), sent);
        assert_eq!(snapshot.view().name, "bat");
        assert_eq!(snapshot.view().stars, 5);
        assert_eq!(snapshot.view().full_name, "");
    }

    #[test]
    fn test_snapshot_view_tolerates_odd_types() {
        let snapshot: RepoSnapshot = serde_json::from_str(
            r#"{"id": "abc", "name": "bat", "stargazers_count": null, "language": 7}"#,
        )
        .unwrap();

        assert_eq!(snapshot.view().id, 0);
        assert_eq!(snapshot.view().stars, 0);
        assert_eq!(snapshot.view().language, None);
        assert_eq!(snapshot.raw()["id"], "abc");
    }

    #[test]
    fn test_snapshot_must_be_an_object() {
        assert!(serde_json::from_str::<RepoSnapshot>("\"bat\"").is_err());
        assert!(serde_json::from_str::<RepoSnapshot>("[1]").is_err());
        assert!(RepoSnapshot::from_value(Value::Null).is_none());
    }

    #[test]
    fn test_snapshot_from_repository() {
        let repo = Repository {
            id: 3,
            full_name: "octo/x".into(),
            stars: 9,
            ..Repository::default()
        };
        let snapshot = RepoSnapshot::from(repo.clone());

        assert_eq!(snapshot.view(), &repo);
        assert_eq!(snapshot.raw()["stargazers_count"], 9);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("stars".parse::<SortKey>().unwrap(), SortKey::Stars);
        assert_eq!("Updated".parse::<SortKey>().unwrap(), SortKey::Updated);
        assert!("forks".parse::<SortKey>().is_err());
        assert_eq!(SortKey::Stars.toggle(), SortKey::Updated);
    }

    #[test]
    fn test_language_filter_all() {
        let all: LanguageFilter = "all".parse().unwrap();
        assert_eq!(all, LanguageFilter::All);
        assert_eq!(all.qualifier(), None);

        let go: LanguageFilter = "Go".parse().unwrap();
        assert_eq!(go.qualifier(), Some("Go"));
        assert_eq!(go.to_string(), "Go");
    }

    #[test]
    fn test_blank_query() {
        assert!(SearchQuery::new("   ").is_blank());
        assert!(!SearchQuery::new("tetris").is_blank());
        assert_eq!(SearchQuery::default().page, 1);
    }
}
