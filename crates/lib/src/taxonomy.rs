//! # Taxonomy
//!
//! The category tree and the synthesizer that grows it during ingestion.
//!
//! The tree is stored flat, linked by `parent_id`. Every operation that adds
//! or moves a node enforces the tree invariants: the parent exists, a node is
//! never its own parent and no move creates a cycle.

use crate::types::{new_id, CategoryType, Script, TaxonomyCategory};
use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaxonomyError {
    #[error("Category not found: {0}")]
    NotFound(String),
    #[error("Parent category not found: {0}")]
    ParentNotFound(String),
    #[error("Category '{0}' cannot be its own parent")]
    SelfParent(String),
    #[error("Moving '{0}' under '{1}' would create a cycle")]
    Cycle(String, String),
    #[error("Category name must not be blank")]
    BlankName,
    #[error("A category with id '{0}' already exists")]
    DuplicateId(String),
}

// --- Queries ---

/// Root categories, shown as "groups".
pub fn groups(taxonomy: &[TaxonomyCategory]) -> Vec<&TaxonomyCategory> {
    taxonomy.iter().filter(|c| c.is_root()).collect()
}

/// Direct children of `parent_id`.
pub fn children<'a>(taxonomy: &'a [TaxonomyCategory], parent_id: &str) -> Vec<&'a TaxonomyCategory> {
    taxonomy
        .iter()
        .filter(|c| c.parent_id.as_deref() == Some(parent_id))
        .collect()
}

/// Ids of every node below `id`, breadth first. `id` itself is not included.
pub fn descendants(taxonomy: &[TaxonomyCategory], id: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut seen: HashSet<&str> = HashSet::from([id]);
    let mut queue: VecDeque<&str> = VecDeque::from([id]);

    while let Some(current) = queue.pop_front() {
        for child in children(taxonomy, current) {
            if seen.insert(child.id.as_str()) {
                found.push(child.id.clone());
                queue.push_back(child.id.as_str());
            }
        }
    }
    found
}

/// Narrowing options for browsing one group of the tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilter {
    pub group_id: String,
    /// Keep nodes bound to this bank or to no bank.
    #[serde(default)]
    pub kb_id: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

/// The group node and its descendants that pass the filter.
pub fn filter<'a>(
    taxonomy: &'a [TaxonomyCategory],
    filter: &CategoryFilter,
) -> Vec<&'a TaxonomyCategory> {
    let mut in_group: HashSet<String> = descendants(taxonomy, &filter.group_id).into_iter().collect();
    in_group.insert(filter.group_id.clone());
    let search = filter
        .search
        .as_deref()
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty());

    taxonomy
        .iter()
        .filter(|c| in_group.contains(&c.id))
        .filter(|c| match (&filter.kb_id, &c.kb_id) {
            (Some(wanted), Some(bound)) => wanted == bound,
            _ => true,
        })
        .filter(|c| match &search {
            Some(term) => c.name.to_lowercase().contains(term),
            None => true,
        })
        .collect()
}

/// Scripts filed under the category's name.
pub fn associated_scripts<'a>(
    taxonomy: &[TaxonomyCategory],
    scripts: &'a [Script],
    category_id: &str,
) -> Result<Vec<&'a Script>, TaxonomyError> {
    let category = find(taxonomy, category_id)?;
    Ok(scripts
        .iter()
        .filter(|s| s.category == category.name)
        .collect())
}

fn find<'a>(taxonomy: &'a [TaxonomyCategory], id: &str) -> Result<&'a TaxonomyCategory, TaxonomyError> {
    taxonomy
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| TaxonomyError::NotFound(id.to_string()))
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

// --- Mutations ---

fn check_parent(
    taxonomy: &[TaxonomyCategory],
    id: &str,
    parent_id: Option<&str>,
) -> Result<(), TaxonomyError> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };
    if parent_id == id {
        return Err(TaxonomyError::SelfParent(id.to_string()));
    }
    if !taxonomy.iter().any(|c| c.id == parent_id) {
        return Err(TaxonomyError::ParentNotFound(parent_id.to_string()));
    }
    if descendants(taxonomy, id).iter().any(|d| d == parent_id) {
        return Err(TaxonomyError::Cycle(id.to_string(), parent_id.to_string()));
    }
    Ok(())
}

/// Inserts one category after checking the tree invariants.
pub fn add_category(
    taxonomy: &mut Vec<TaxonomyCategory>,
    category: TaxonomyCategory,
) -> Result<(), TaxonomyError> {
    if category.name.trim().is_empty() {
        return Err(TaxonomyError::BlankName);
    }
    if taxonomy.iter().any(|c| c.id == category.id) {
        return Err(TaxonomyError::DuplicateId(category.id));
    }
    check_parent(taxonomy, &category.id, category.parent_id.as_deref())?;
    taxonomy.push(category);
    Ok(())
}

/// Adds one category per non-blank line under `parent_id`.
///
/// Lines whose name already exists under the same parent (ignoring case),
/// or that repeat an earlier line, are skipped. Returns the created nodes.
pub fn bulk_import(
    taxonomy: &mut Vec<TaxonomyCategory>,
    parent_id: Option<&str>,
    lines: &str,
    kb_id: Option<&str>,
) -> Result<Vec<TaxonomyCategory>, TaxonomyError> {
    if let Some(parent) = parent_id {
        find(taxonomy, parent).map_err(|_| TaxonomyError::ParentNotFound(parent.to_string()))?;
    }

    let mut created = Vec::new();
    for line in lines.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let duplicate = taxonomy
            .iter()
            .any(|c| c.parent_id.as_deref() == parent_id && same_name(&c.name, line));
        if duplicate {
            debug!("Skipping duplicate category '{line}'.");
            continue;
        }
        let mut category = TaxonomyCategory::new(new_id("CAT"), line, parent_id.map(String::from));
        category.kb_id = kb_id.map(String::from);
        taxonomy.push(category.clone());
        created.push(category);
    }
    Ok(created)
}

/// A partial update to one category. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub prompt_context: Option<String>,
    pub force_hierarchy: Option<bool>,
    pub few_shot_examples: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
    pub kb_id: Option<String>,
    /// `Some(None)` moves the node to the top level.
    #[serde(default, with = "double_option")]
    pub parent_id: Option<Option<String>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

/// Applies a partial update, re-checking the invariants when the node moves.
pub fn update_category(
    taxonomy: &mut [TaxonomyCategory],
    id: &str,
    update: CategoryUpdate,
) -> Result<(), TaxonomyError> {
    find(taxonomy, id)?;
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(TaxonomyError::BlankName);
        }
    }
    if let Some(new_parent) = &update.parent_id {
        check_parent(taxonomy, id, new_parent.as_deref())?;
    }

    let Some(category) = taxonomy.iter_mut().find(|c| c.id == id) else {
        return Err(TaxonomyError::NotFound(id.to_string()));
    };
    if let Some(name) = update.name {
        category.name = name.trim().to_string();
    }
    if let Some(description) = update.description {
        category.description = Some(description);
    }
    if let Some(context) = update.prompt_context {
        category.prompt_context = Some(context);
    }
    if let Some(force) = update.force_hierarchy {
        category.force_hierarchy = force;
    }
    if let Some(examples) = update.few_shot_examples {
        category.few_shot_examples = examples;
    }
    if let Some(kind) = update.category_type {
        category.category_type = kind;
    }
    if let Some(kb_id) = update.kb_id {
        category.kb_id = Some(kb_id);
    }
    if let Some(parent_id) = update.parent_id {
        category.parent_id = parent_id;
    }
    Ok(())
}

/// Removes a category and its whole subtree. Returns the removed ids.
pub fn remove_category(
    taxonomy: &mut Vec<TaxonomyCategory>,
    id: &str,
) -> Result<Vec<String>, TaxonomyError> {
    find(taxonomy, id)?;
    let mut removed = vec![id.to_string()];
    removed.extend(descendants(taxonomy, id));
    let doomed: HashSet<&str> = removed.iter().map(String::as_str).collect();
    taxonomy.retain(|c| !doomed.contains(c.id.as_str()));
    Ok(removed)
}

// --- Synthesis during ingestion ---

/// What one ingestion run adds to the taxonomy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyDelta {
    /// New nodes, root first when one was synthesized.
    pub created: Vec<TaxonomyCategory>,
    /// How many scripts were filed under each pre-existing node.
    pub count_increments: HashMap<String, usize>,
}

impl TaxonomyDelta {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.count_increments.is_empty()
    }

    /// Drops created nodes that ended up with no scripts and no kept children.
    ///
    /// Used when a run fails part way, so a group announced at the start of
    /// the run is not left behind empty.
    pub fn prune_unfilled(&mut self) {
        let parents: HashSet<String> = self
            .created
            .iter()
            .filter(|c| c.count > 0)
            .filter_map(|c| c.parent_id.clone())
            .collect();
        self.created
            .retain(|c| c.count > 0 || parents.contains(&c.id));
        self.count_increments.retain(|_, increment| *increment > 0);
    }

    /// Merges the delta into the tree, checking invariants per node.
    ///
    /// Nodes whose id already exists are skipped, so merging twice is harmless.
    /// A new child whose name already exists under the same parent (ignoring
    /// case) is folded into that node, and `scripts` filed under the new name
    /// are moved to the existing one. Two runs that overlap under one root
    /// therefore still produce a single child per name.
    pub fn merge_into(
        self,
        taxonomy: &mut Vec<TaxonomyCategory>,
        scripts: &mut [Script],
    ) -> Result<(), TaxonomyError> {
        let mut folded_ids: HashMap<String, String> = HashMap::new();
        let mut renamed: HashMap<String, String> = HashMap::new();

        for mut category in self.created {
            if taxonomy.iter().any(|c| c.id == category.id) {
                warn!("Category '{}' is already present; skipping.", category.id);
                continue;
            }
            if let Some(parent) = &category.parent_id {
                if let Some(target) = folded_ids.get(parent) {
                    category.parent_id = Some(target.clone());
                }
            }

            let twin = category.parent_id.as_deref().and_then(|parent| {
                taxonomy.iter_mut().find(|c| {
                    c.parent_id.as_deref() == Some(parent) && same_name(&c.name, &category.name)
                })
            });
            match twin {
                Some(existing) => {
                    debug!(
                        "Folding new category '{}' into existing '{}'.",
                        category.name, existing.id
                    );
                    existing.count += category.count;
                    if existing.name != category.name {
                        renamed.insert(category.name.clone(), existing.name.clone());
                    }
                    folded_ids.insert(category.id, existing.id.clone());
                }
                None => add_category(taxonomy, category)?,
            }
        }

        for (id, increment) in self.count_increments {
            if let Some(category) = taxonomy.iter_mut().find(|c| c.id == id) {
                category.count += increment;
            }
        }

        if !renamed.is_empty() {
            for script in scripts.iter_mut() {
                if let Some(name) = renamed.get(&script.category) {
                    script.category = name.clone();
                }
            }
        }
        Ok(())
    }
}

/// Creates category nodes on demand while an ingestion run files records.
///
/// New nodes are only collected here; they reach the store once per run.
#[derive(Debug)]
pub struct TaxonomySynthesizer<'a> {
    existing: &'a [TaxonomyCategory],
    root_id: String,
    root_name: String,
    kb_id: Option<String>,
    created: Vec<TaxonomyCategory>,
    count_increments: HashMap<String, usize>,
}

impl<'a> TaxonomySynthesizer<'a> {
    /// Starts a run under `root_id`, or under a fresh root named `group_name`
    /// when no root is given or the given one no longer exists.
    pub fn new(
        existing: &'a [TaxonomyCategory],
        root_id: Option<&str>,
        group_name: &str,
        kb_id: Option<&str>,
    ) -> Self {
        let mut synthesizer = Self {
            existing,
            root_id: String::new(),
            root_name: String::new(),
            kb_id: kb_id.map(String::from),
            created: Vec::new(),
            count_increments: HashMap::new(),
        };

        match root_id.and_then(|id| existing.iter().find(|c| c.id == id)) {
            Some(root) => {
                synthesizer.root_id = root.id.clone();
                synthesizer.root_name = root.name.clone();
            }
            None => {
                if let Some(missing) = root_id {
                    warn!("Root category '{missing}' does not exist; creating a new group.");
                }
                let mut root = TaxonomyCategory::new(new_id("ROOT-GRP"), group_name, None);
                root.kb_id = synthesizer.kb_id.clone();
                synthesizer.root_id = root.id.clone();
                synthesizer.root_name = root.name.clone();
                synthesizer.created.push(root);
            }
        }
        synthesizer
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Whether this run created its own root node.
    pub fn created_root(&self) -> bool {
        self.created.first().is_some_and(|c| c.id == self.root_id)
    }

    /// Resolves a category name to the node it is filed under.
    ///
    /// Returns the name to store on the script and whether a node was created.
    /// A child of the active root with the same name (ignoring case) is reused,
    /// whether it existed before the run or was created earlier in it.
    pub fn resolve(&mut self, category_name: &str) -> (String, bool) {
        let name = category_name.trim();

        if let Some(node) = self
            .created
            .iter_mut()
            .find(|c| c.parent_id.as_deref() == Some(self.root_id.as_str()) && same_name(&c.name, name))
        {
            node.count += 1;
            return (node.name.clone(), false);
        }

        if let Some(node) = self
            .existing
            .iter()
            .find(|c| c.parent_id.as_deref() == Some(self.root_id.as_str()) && same_name(&c.name, name))
        {
            *self.count_increments.entry(node.id.clone()).or_default() += 1;
            return (node.name.clone(), false);
        }

        let mut node = TaxonomyCategory::new(new_id("BRANCH"), name, Some(self.root_id.clone()));
        node.kb_id = self.kb_id.clone();
        node.count = 1;
        let resolved = node.name.clone();
        self.created.push(node);
        (resolved, true)
    }

    /// The nodes created so far, root first when one was synthesized.
    pub fn created(&self) -> &[TaxonomyCategory] {
        &self.created
    }

    pub fn into_delta(self) -> TaxonomyDelta {
        TaxonomyDelta {
            created: self.created,
            count_increments: self.count_increments,
        }
    }
}
