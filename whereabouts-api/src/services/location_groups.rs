//! Location groups used to build unlock lists
//!
//! Two interchangeable sources sit behind `LocationGroupService`: a flat
//! properties file of regex lists, and the Prison API's own group tree.

use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use whereabouts_common::{Error, Result};

use crate::auth::AuthContext;
use crate::clients::{Location, LocationGroup, PrisonApi};
use crate::{ApiError, ApiResult};

/// Location type fetched when resolving a group to cells
pub const CELL_LOCATION_TYPE: &str = "CELL";

/// Predicate deciding whether a location belongs to a group
#[derive(Debug, Clone)]
pub enum LocationGroupFilter {
    /// Any of the patterns fully matches the location prefix
    Patterns(Vec<Regex>),
    /// The location prefix starts with this string
    Prefix(String),
}

impl LocationGroupFilter {
    pub fn matches(&self, location: &Location) -> bool {
        match self {
            LocationGroupFilter::Patterns(patterns) => patterns
                .iter()
                .any(|pattern| pattern.is_match(&location.location_prefix)),
            LocationGroupFilter::Prefix(prefix) => location.location_prefix.starts_with(prefix),
        }
    }
}

#[async_trait]
pub trait LocationGroupService: Send + Sync {
    /// Groups configured for an agency, sorted, each with its sub-groups
    async fn get_location_groups(
        &self,
        ctx: &AuthContext,
        agency_id: &str,
    ) -> ApiResult<Vec<LocationGroup>>;

    /// Filter for `group_name`, which is `GROUP` or `GROUP_SUBGROUP`
    async fn location_group_filter(
        &self,
        ctx: &AuthContext,
        agency_id: &str,
        group_name: &str,
    ) -> ApiResult<LocationGroupFilter>;
}

/// Groups read from `AGENCY_GROUP[_SUBGROUP]=regex,regex,...` properties
#[derive(Debug, Clone, Default)]
pub struct PropertiesLocationGroupService {
    patterns: BTreeMap<String, Vec<Regex>>,
}

impl PropertiesLocationGroupService {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read location groups {} failed: {}", path.display(), e))
        })?;
        let service = Self::from_properties_str(&content)?;
        info!(
            "Loaded {} location group definitions from {}",
            service.patterns.len(),
            path.display()
        );
        Ok(service)
    }

    pub fn from_properties_str(content: &str) -> Result<Self> {
        let mut patterns = BTreeMap::new();
        for (key, value) in parse_properties(content) {
            let compiled = value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| {
                    // Anchored: the whole prefix must match
                    Regex::new(&format!("^(?:{})$", p)).map_err(|e| {
                        Error::Config(format!("Invalid pattern for {}: {}", key, e))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            patterns.insert(key, compiled);
        }
        Ok(Self { patterns })
    }

    fn groups_for(&self, agency_id: &str) -> Vec<LocationGroup> {
        let agency_prefix = format!("{}_", agency_id);
        let mut groups: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for key in self.patterns.keys() {
            let Some(rest) = key.strip_prefix(&agency_prefix) else {
                continue;
            };
            match rest.split_once('_') {
                Some((group, sub_group)) => {
                    groups.entry(group).or_default().insert(sub_group);
                }
                None => {
                    groups.entry(rest).or_default();
                }
            }
        }

        groups
            .into_iter()
            .map(|(group, sub_groups)| LocationGroup {
                key: group.to_string(),
                name: group.to_string(),
                children: sub_groups.into_iter().map(LocationGroup::leaf).collect(),
            })
            .collect()
    }

    fn filter_for(&self, agency_id: &str, group_name: &str) -> ApiResult<LocationGroupFilter> {
        let key = format!("{}_{}", agency_id, group_name);
        let sub_prefix = format!("{}_", key);

        let patterns: Vec<Regex> = self
            .patterns
            .iter()
            .filter(|(k, _)| **k == key || k.starts_with(&sub_prefix))
            .flat_map(|(_, patterns)| patterns.iter().cloned())
            .collect();

        if patterns.is_empty() {
            return Err(ApiError::NotFound(format!(
                "Group {} does not exist for agencyId {}.",
                group_name, agency_id
            )));
        }
        debug!(agency_id, group_name, patterns = patterns.len(), "Built location group filter");
        Ok(LocationGroupFilter::Patterns(patterns))
    }
}

#[async_trait]
impl LocationGroupService for PropertiesLocationGroupService {
    async fn get_location_groups(
        &self,
        _ctx: &AuthContext,
        agency_id: &str,
    ) -> ApiResult<Vec<LocationGroup>> {
        Ok(self.groups_for(agency_id))
    }

    async fn location_group_filter(
        &self,
        _ctx: &AuthContext,
        agency_id: &str,
        group_name: &str,
    ) -> ApiResult<LocationGroupFilter> {
        self.filter_for(agency_id, group_name)
    }
}

/// Groups taken from the Prison API
pub struct UpstreamLocationGroupService {
    prison_api: Arc<dyn PrisonApi>,
}

impl UpstreamLocationGroupService {
    pub fn new(prison_api: Arc<dyn PrisonApi>) -> Self {
        Self { prison_api }
    }
}

#[async_trait]
impl LocationGroupService for UpstreamLocationGroupService {
    async fn get_location_groups(
        &self,
        ctx: &AuthContext,
        agency_id: &str,
    ) -> ApiResult<Vec<LocationGroup>> {
        Ok(self.prison_api.get_location_groups(ctx.token(), agency_id).await?)
    }

    async fn location_group_filter(
        &self,
        ctx: &AuthContext,
        agency_id: &str,
        group_name: &str,
    ) -> ApiResult<LocationGroupFilter> {
        let groups = self.prison_api.get_location_groups(ctx.token(), agency_id).await?;

        let (group_key, sub_key) = match group_name.split_once('_') {
            Some((group, sub)) => (group, Some(sub)),
            None => (group_name, None),
        };
        let group = groups.iter().find(|g| g.key == group_key);
        let found = match (group, sub_key) {
            (Some(g), Some(sub)) => g.children.iter().any(|c| c.key == sub),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !found {
            return Err(ApiError::NotFound(format!(
                "Group {} does not exist for agencyId {}.",
                group_name, agency_id
            )));
        }

        let prefix = match sub_key {
            Some(sub) => format!("{}-{}-{}-", agency_id, group_key, sub),
            None => format!("{}-{}-", agency_id, group_key),
        };
        Ok(LocationGroupFilter::Prefix(prefix))
    }
}

/// Cells of an agency that belong to a location group
pub async fn cells_for_group(
    groups: &dyn LocationGroupService,
    prison_api: &dyn PrisonApi,
    ctx: &AuthContext,
    agency_id: &str,
    group_name: &str,
) -> ApiResult<Vec<Location>> {
    let filter = groups.location_group_filter(ctx, agency_id, group_name).await?;
    let cells = prison_api
        .get_locations_for_type(ctx.token(), agency_id, CELL_LOCATION_TYPE)
        .await?;
    Ok(cells.into_iter().filter(|cell| filter.matches(cell)).collect())
}

/// Parse `key=value` lines
///
/// `#` and `!` start comments; a trailing unescaped backslash continues the
/// value on the next line. The key ends at the first unescaped `=`, `:` or
/// whitespace, and `\ `, `\=`, `\:` and `\\` escapes are resolved in it.
/// Values are kept verbatim so regex escapes such as `\d` survive.
pub fn parse_properties(content: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut pending = String::new();

    for raw in content.lines() {
        let line = raw.trim();
        if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }

        if continues(line) {
            pending.push_str(&line[..line.len() - 1]);
            continue;
        }
        pending.push_str(line);

        let logical = std::mem::take(&mut pending);
        let (key, value) = split_entry(&logical);
        if !key.is_empty() {
            entries.push((key, value.to_string()));
        }
    }

    entries
}

/// Odd number of trailing backslashes
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, &str) {
    let mut key = String::new();
    let mut rest = "";
    let mut chars = line.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    key.push(escaped);
                }
            }
            '=' | ':' => {
                rest = &line[i + 1..];
                break;
            }
            c if c.is_whitespace() => {
                let after = line[i..].trim_start();
                rest = after
                    .strip_prefix('=')
                    .or_else(|| after.strip_prefix(':'))
                    .unwrap_or(after);
                break;
            }
            c => key.push(c),
        }
    }

    (key, rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(prefix: &str) -> Location {
        Location {
            location_id: 1,
            location_type: CELL_LOCATION_TYPE.to_string(),
            description: prefix.to_string(),
            location_prefix: prefix.to_string(),
            user_description: None,
            internal_location_code: None,
        }
    }

    #[test]
    fn test_parse_properties_skips_comments_and_joins_continuations() {
        let entries = parse_properties(
            "# comment\n\
             ! also a comment\n\
             \n\
             MDI_1_A = MDI-1-1-0(0[1-9]|1[0-2]),\\\n\
             \x20   MDI-1-2-0(0[1-9]|1[0-2])\n\
             LEI_A=LEI-A-.*\n",
        );
        assert_eq!(
            entries,
            vec![
                (
                    "MDI_1_A".to_string(),
                    "MDI-1-1-0(0[1-9]|1[0-2]),MDI-1-2-0(0[1-9]|1[0-2])".to_string()
                ),
                ("LEI_A".to_string(), "LEI-A-.*".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_properties_key_escapes_and_separators() {
        let entries = parse_properties(
            "MDI_Houseblock\\ 1=MDI-1-.*\n\
             LEI_A LEI-A-.*\n\
             LEI_B : LEI-B-\\d-.*\n\
             odd\\:key\\=name = x\n",
        );
        assert_eq!(
            entries,
            vec![
                ("MDI_Houseblock 1".to_string(), "MDI-1-.*".to_string()),
                ("LEI_A".to_string(), "LEI-A-.*".to_string()),
                ("LEI_B".to_string(), "LEI-B-\\d-.*".to_string()),
                ("odd:key=name".to_string(), "x".to_string()),
            ]
        );
    }

    #[test]
    fn test_escaped_trailing_backslash_does_not_continue() {
        let entries = parse_properties("A=x\\\\\nB=y\n");
        assert_eq!(
            entries,
            vec![
                ("A".to_string(), "x\\\\".to_string()),
                ("B".to_string(), "y".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter_from_sub_group_key() {
        let service = PropertiesLocationGroupService::from_properties_str("LEI_A_1 = LEI-A-1-.*").unwrap();
        let filter = service.filter_for("LEI", "A").unwrap();

        assert!(filter.matches(&location("LEI-A-1-003")));
        assert!(!filter.matches(&location("LEI-B-1-003")));
    }

    #[test]
    fn test_patterns_must_match_whole_prefix() {
        let service = PropertiesLocationGroupService::from_properties_str("LEI_A=A-1").unwrap();
        let filter = service.filter_for("LEI", "A").unwrap();

        assert!(filter.matches(&location("A-1")));
        assert!(!filter.matches(&location("LEI-A-1")));
    }

    #[test]
    fn test_unknown_group_not_found() {
        let service = PropertiesLocationGroupService::from_properties_str("LEI_A_1=LEI-A-1-.*").unwrap();
        assert!(matches!(service.filter_for("LEI", "B"), Err(ApiError::NotFound(_))));
        assert!(matches!(service.filter_for("MDI", "A"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_groups_sorted_with_sub_groups() {
        let service = PropertiesLocationGroupService::from_properties_str(
            "MDI_2=MDI-2-.*\n\
             MDI_1_B=MDI-1-2-.*\n\
             MDI_1_A=MDI-1-1-.*\n\
             LEI_A=LEI-A-.*\n",
        )
        .unwrap();

        let groups = service.groups_for("MDI");
        assert_eq!(
            groups,
            vec![
                LocationGroup {
                    key: "1".to_string(),
                    name: "1".to_string(),
                    children: vec![LocationGroup::leaf("A"), LocationGroup::leaf("B")],
                },
                LocationGroup::leaf("2"),
            ]
        );
        assert!(service.groups_for("BXI").is_empty());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(PropertiesLocationGroupService::from_properties_str("LEI_A=LEI-(").is_err());
    }
}
