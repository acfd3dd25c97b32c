//! Dataset loading: tab-separated fact files and their vocabularies.
//!
//! A dataset directory holds `train.txt` with one fact per line:
//! `subject<TAB>relation<TAB>object<TAB>timestamp`. Optional `entity2id.json`,
//! `relation2id.json` and `ts2id.json` pin the id assignment; without them ids
//! are handed out in order of first appearance.
//!
//! Every relation `r` with id `i` among `n` relations gets an inverse `_r`
//! with id `i + n`, and every fact is added in both directions.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{GraphError, GraphResult};

use super::{EdgeIndex, EntityId, InverseRelations, Quad, RelationId, Timestamp};

/// Name ↔ id mappings for entities and relations (inverses included).
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    pub entity2id: HashMap<String, EntityId>,
    pub relation2id: HashMap<String, RelationId>,
    pub id2relation: HashMap<RelationId, String>,
    pub inverse: InverseRelations,
}

impl Vocabulary {
    /// Build a vocabulary from base relation names, registering `_name` inverses.
    ///
    /// Inverse ids start right after the largest base id, so sparse id
    /// mappings stay collision-free. Two names sharing an id are rejected.
    fn with_relations(
        entity2id: HashMap<String, EntityId>,
        relation2id: HashMap<String, RelationId>,
        path: &Path,
    ) -> GraphResult<Self> {
        let mapping_error = |message: String| GraphError::Mapping {
            path: path.display().to_string(),
            message,
        };
        let offset = match relation2id.values().max() {
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| mapping_error(format!("relation id {max} leaves no room for inverses")))?,
            None => 0,
        };

        let mut vocab = Self {
            entity2id,
            ..Default::default()
        };
        for (name, id) in relation2id {
            if let Some(other) = vocab.id2relation.get(&id) {
                return Err(mapping_error(format!(
                    "relations {other:?} and {name:?} share id {id}"
                )));
            }
            let inv = id
                .checked_add(offset)
                .ok_or_else(|| mapping_error(format!("inverse id of relation {name:?} overflows")))?;
            vocab.inverse.insert_pair(id, inv);
            vocab.id2relation.insert(id, name.clone());
            vocab.id2relation.insert(inv, format!("_{name}"));
            vocab.relation2id.insert(format!("_{name}"), inv);
            vocab.relation2id.insert(name, id);
        }
        Ok(vocab)
    }

    /// Human-readable name of a relation, falling back to its id.
    pub fn relation_name(&self, relation: RelationId) -> String {
        self.id2relation
            .get(&relation)
            .cloned()
            .unwrap_or_else(|| relation.to_string())
    }

    pub fn num_entities(&self) -> usize {
        self.entity2id.len()
    }

    /// Number of relations, inverses included.
    pub fn num_relations(&self) -> usize {
        self.id2relation.len()
    }
}

/// A loaded dataset: vocabulary plus the learning facts (with inverse facts).
#[derive(Debug, Clone)]
pub struct Dataset {
    pub vocab: Vocabulary,
    pub facts: Vec<Quad>,
}

impl Dataset {
    /// Load `train.txt` (and any id mappings) from `dir`.
    pub fn load(dir: &Path) -> GraphResult<Self> {
        let train_path = dir.join("train.txt");
        let content = read_file(&train_path)?;
        let rows = parse_rows(&content, &train_path)?;

        let entity_map = read_mapping(&dir.join("entity2id.json"))?;
        let relation_map = read_mapping(&dir.join("relation2id.json"))?;
        let ts_map = read_mapping(&dir.join("ts2id.json"))?;

        let dataset = Self::build(rows, entity_map, relation_map, ts_map, &train_path)?;
        tracing::info!(
            path = %dir.display(),
            entities = dataset.vocab.num_entities(),
            relations = dataset.vocab.num_relations(),
            facts = dataset.facts.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Build a dataset from named facts with integer timestamps.
    pub fn from_named<'a, I>(facts: I) -> GraphResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str, Timestamp)>,
    {
        let rows = facts
            .into_iter()
            .enumerate()
            .map(|(i, (s, r, o, t))| Row {
                line: i + 1,
                subject: s.to_string(),
                relation: r.to_string(),
                object: o.to_string(),
                timestamp: t.to_string(),
            })
            .collect();
        Self::build(rows, None, None, None, Path::new("<memory>"))
    }

    fn build(
        rows: Vec<Row>,
        entity_map: Option<HashMap<String, i64>>,
        relation_map: Option<HashMap<String, i64>>,
        ts_map: Option<HashMap<String, i64>>,
        path: &Path,
    ) -> GraphResult<Self> {
        let fixed_entities = entity_map.is_some();
        let fixed_relations = relation_map.is_some();

        let entity2id = match entity_map {
            Some(m) => to_ids(m, path)?,
            None => first_appearance(rows.iter().flat_map(|r| [&r.subject, &r.object])),
        };
        let relation2id = match relation_map {
            Some(m) => to_ids(m, path)?,
            None => first_appearance(rows.iter().map(|r| &r.relation)),
        };
        let vocab = Vocabulary::with_relations(entity2id, relation2id, path)?;

        let mut facts = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            let malformed = |message: String| GraphError::Malformed {
                path: path.display().to_string(),
                line: row.line,
                message,
            };
            let subject = *vocab
                .entity2id
                .get(&row.subject)
                .ok_or_else(|| malformed(unknown("entity", &row.subject, fixed_entities)))?;
            let object = *vocab
                .entity2id
                .get(&row.object)
                .ok_or_else(|| malformed(unknown("entity", &row.object, fixed_entities)))?;
            let relation = *vocab
                .relation2id
                .get(&row.relation)
                .ok_or_else(|| malformed(unknown("relation", &row.relation, fixed_relations)))?;
            let timestamp = match &ts_map {
                Some(m) => *m
                    .get(&row.timestamp)
                    .ok_or_else(|| malformed(format!("unknown timestamp {:?}", row.timestamp)))?,
                None => row
                    .timestamp
                    .parse::<Timestamp>()
                    .map_err(|e| malformed(format!("bad timestamp {:?}: {e}", row.timestamp)))?,
            };

            let fact = Quad::new(subject, relation, object, timestamp);
            facts.push(fact);
            facts.push(fact.reversed(vocab.inverse.inverse_of(relation)?));
        }

        Ok(Self { vocab, facts })
    }

    /// Build the edge index over the learning facts.
    pub fn index(&self) -> EdgeIndex {
        EdgeIndex::build(&self.facts)
    }
}

struct Row {
    line: usize,
    subject: String,
    relation: String,
    object: String,
    timestamp: String,
}

fn read_file(path: &Path) -> GraphResult<String> {
    std::fs::read_to_string(path).map_err(|e| GraphError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn parse_rows(content: &str, path: &Path) -> GraphResult<Vec<Row>> {
    let mut rows = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(GraphError::Malformed {
                path: path.display().to_string(),
                line: i + 1,
                message: format!("expected 4 tab-separated fields, got {}", fields.len()),
            });
        }
        rows.push(Row {
            line: i + 1,
            subject: fields[0].to_string(),
            relation: fields[1].to_string(),
            object: fields[2].to_string(),
            timestamp: fields[3].to_string(),
        });
    }
    Ok(rows)
}

/// Read an optional `name → id` JSON mapping. A missing file yields `None`.
fn read_mapping(path: &Path) -> GraphResult<Option<HashMap<String, i64>>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = read_file(path)?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| GraphError::Mapping {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

fn to_ids(map: HashMap<String, i64>, path: &Path) -> GraphResult<HashMap<String, u32>> {
    map.into_iter()
        .map(|(name, id)| {
            u32::try_from(id)
                .map(|id| (name.clone(), id))
                .map_err(|_| GraphError::Mapping {
                    path: path.display().to_string(),
                    message: format!("id {id} for {name:?} is out of range"),
                })
        })
        .collect()
}

fn first_appearance<'a>(names: impl Iterator<Item = &'a String>) -> HashMap<String, u32> {
    let mut ids = HashMap::new();
    for name in names {
        let next = ids.len() as u32;
        ids.entry(name.clone()).or_insert(next);
    }
    ids
}

fn unknown(kind: &str, name: &str, fixed: bool) -> String {
    if fixed {
        format!("{kind} {name:?} is missing from the id mapping")
    } else {
        format!("unknown {kind} {name:?}")
    }
}
