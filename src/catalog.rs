//! The static check catalog and the selection surface.
//!
//! Item ids are stable and contiguous: 1 is the reachability gate,
//! the mount checks follow, then the topic checks in group order. Ids
//! never change meaning within a deployment, which is what makes
//! selective retry by id sound.

use std::collections::{BTreeSet, HashMap};

use crate::config::CheckConfig;

/// Id of the reachability gate; always the first catalog entry.
pub const GATE_ITEM_ID: u32 = 1;

/// Which family of check an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckGroup {
    Gate,
    Mount,
    Topic,
}

/// One entry in the check catalog.
#[derive(Debug, Clone)]
pub struct CheckItem {
    pub id: u32,
    pub name: String,
    pub group: CheckGroup,
    /// The remote command for topic checks; gate and mount checks
    /// derive their commands elsewhere.
    pub command: Option<String>,
    /// Host the check runs against; the gate spans all hosts.
    pub host: Option<String>,
    /// Index into `CheckConfig::mounts` for mount checks.
    pub mount_index: Option<usize>,
    /// Alias of the topic group this item belongs to.
    pub group_alias: Option<String>,
    /// Operator instruction prepended to failure messages.
    pub safety_note: Option<String>,
}

/// The full catalog for one deployment, plus the alias id-sets the
/// selection surface resolves against.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CheckItem>,
    aliases: HashMap<String, BTreeSet<u32>>,
}

impl Catalog {
    /// Build the catalog from a deployment configuration.
    pub fn build(cfg: &CheckConfig) -> Self {
        let mut items = vec![CheckItem {
            id: GATE_ITEM_ID,
            name: "rig link".to_string(),
            group: CheckGroup::Gate,
            command: None,
            host: None,
            mount_index: None,
            group_alias: None,
            safety_note: None,
        }];

        let mut next_id = GATE_ITEM_ID + 1;
        for (idx, mount) in cfg.mounts.iter().enumerate() {
            items.push(CheckItem {
                id: next_id,
                name: format!("{} {}", mount.host, mount.label),
                group: CheckGroup::Mount,
                command: None,
                host: Some(mount.host.clone()),
                mount_index: Some(idx),
                group_alias: None,
                safety_note: None,
            });
            next_id += 1;
        }

        for group in &cfg.topic_groups {
            for topic in &group.topics {
                items.push(CheckItem {
                    id: next_id,
                    name: topic.name.clone(),
                    group: CheckGroup::Topic,
                    command: Some(cfg.rate_command(&topic.topic)),
                    host: Some(group.host.clone()),
                    mount_index: None,
                    group_alias: Some(group.alias.clone()),
                    safety_note: topic.safety_note.clone(),
                });
                next_id += 1;
            }
        }

        let aliases = build_aliases(cfg, &items);
        Self { items, aliases }
    }

    pub fn items(&self) -> &[CheckItem] {
        &self.items
    }

    /// The reachability gate entry.
    pub fn gate(&self) -> &CheckItem {
        &self.items[0]
    }

    pub fn contains_id(&self, id: u32) -> bool {
        id >= GATE_ITEM_ID && id < GATE_ITEM_ID + self.items.len() as u32
    }

    pub fn alias_ids(&self, alias: &str) -> Option<&BTreeSet<u32>> {
        self.aliases.get(alias)
    }

    /// Topic items belonging to one group, in catalog order.
    pub fn group_items(&self, alias: &str) -> Vec<&CheckItem> {
        self.items
            .iter()
            .filter(|item| item.group_alias.as_deref() == Some(alias))
            .collect()
    }
}

fn build_aliases(cfg: &CheckConfig, items: &[CheckItem]) -> HashMap<String, BTreeSet<u32>> {
    let mut aliases: HashMap<String, BTreeSet<u32>> = HashMap::new();

    let gate: BTreeSet<u32> = [GATE_ITEM_ID].into();
    aliases.insert("gate".to_string(), gate);

    let mounts: BTreeSet<u32> = items
        .iter()
        .filter(|i| i.group == CheckGroup::Mount)
        .map(|i| i.id)
        .collect();
    aliases.insert("mount".to_string(), mounts.clone());
    aliases.insert("mounts".to_string(), mounts);

    let topics: BTreeSet<u32> = items
        .iter()
        .filter(|i| i.group == CheckGroup::Topic)
        .map(|i| i.id)
        .collect();
    aliases.insert("topic".to_string(), topics.clone());
    aliases.insert("topics".to_string(), topics);

    // A group alias selects the group's topics plus the mount on the
    // same host.
    for group in &cfg.topic_groups {
        let mut set: BTreeSet<u32> = items
            .iter()
            .filter(|i| i.group_alias.as_deref() == Some(group.alias.as_str()))
            .map(|i| i.id)
            .collect();
        for item in items.iter().filter(|i| i.group == CheckGroup::Mount) {
            if item.host.as_deref() == Some(group.host.as_str()) {
                set.insert(item.id);
            }
        }
        aliases.insert(group.alias.to_ascii_lowercase(), set);
    }

    aliases
}

/// Which catalog items a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Ids(BTreeSet<u32>),
}

impl Selection {
    /// Parse a selector string: a comma-separated id list, a named
    /// alias, or "all". Empty or unrecognized input means everything.
    pub fn parse(text: &str, catalog: &Catalog) -> Self {
        let text = text.trim().to_ascii_lowercase();
        if text.is_empty() || text == "all" {
            return Selection::All;
        }

        if let Some(ids) = catalog.alias_ids(&text) {
            return Selection::Ids(ids.clone());
        }

        let mut ids = BTreeSet::new();
        for part in text.split(',') {
            if let Ok(id) = part.trim().parse::<u32>() {
                if catalog.contains_id(id) {
                    ids.insert(id);
                }
            }
        }

        if ids.is_empty() {
            Selection::All
        } else {
            Selection::Ids(ids)
        }
    }

    /// An explicit id set; may be empty, in which case a run covers
    /// nothing and succeeds trivially.
    pub fn from_ids(ids: BTreeSet<u32>) -> Self {
        Selection::Ids(ids)
    }

    pub fn contains(&self, id: u32) -> bool {
        match self {
            Selection::All => true,
            Selection::Ids(ids) => ids.contains(&id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::build(&CheckConfig::default())
    }

    #[test]
    fn test_ids_are_contiguous_and_stable() {
        let catalog = catalog();
        let items = catalog.items();
        assert_eq!(items.len(), 13);
        for (idx, item) in items.iter().enumerate() {
            assert_eq!(item.id, idx as u32 + 1);
        }
        assert_eq!(items[0].group, CheckGroup::Gate);
        assert_eq!(items[1].group, CheckGroup::Mount);
        assert_eq!(items[2].group, CheckGroup::Mount);
        assert!(items[3..].iter().all(|i| i.group == CheckGroup::Topic));
    }

    #[test]
    fn test_forward_lidar_annotation() {
        let catalog = catalog();
        let forward = catalog
            .items()
            .iter()
            .find(|i| i.name == "MDC1A forward lidar")
            .unwrap();
        assert_eq!(forward.id, 9);
        assert!(forward.safety_note.is_some());
    }

    #[test]
    fn test_alias_sets() {
        let catalog = catalog();
        let ids = |alias: &str| -> Vec<u32> {
            catalog.alias_ids(alias).unwrap().iter().copied().collect()
        };
        assert_eq!(ids("gate"), vec![1]);
        assert_eq!(ids("mount"), vec![2, 3]);
        assert_eq!(ids("topic"), (4..=13).collect::<Vec<u32>>());
        assert_eq!(ids("mdc1"), vec![2, 4, 5, 6, 7, 8, 9]);
        assert_eq!(ids("mdc2"), vec![3, 10, 11, 12, 13]);
    }

    #[test]
    fn test_parse_id_list() {
        let catalog = catalog();
        let sel = Selection::parse("2, 5,99", &catalog);
        assert_eq!(sel, Selection::Ids([2, 5].into()));
    }

    #[test]
    fn test_parse_alias() {
        let catalog = catalog();
        assert_eq!(
            Selection::parse("MOUNTS", &catalog),
            Selection::Ids([2, 3].into())
        );
    }

    #[test]
    fn test_parse_empty_or_garbage_means_all() {
        let catalog = catalog();
        assert_eq!(Selection::parse("", &catalog), Selection::All);
        assert_eq!(Selection::parse("all", &catalog), Selection::All);
        assert_eq!(Selection::parse("nonsense", &catalog), Selection::All);
        // Out-of-range ids only: falls back to everything.
        assert_eq!(Selection::parse("99,100", &catalog), Selection::All);
    }

    #[test]
    fn test_group_items_in_order() {
        let catalog = catalog();
        let mdc1: Vec<u32> = catalog.group_items("mdc1").iter().map(|i| i.id).collect();
        assert_eq!(mdc1, vec![4, 5, 6, 7, 8, 9]);
    }
}
