//! Ontology documents.
//!
//! An ontology is saved as one JSON document holding the statements it owns,
//! annotations and their axiom nodes included. Documents are written to a
//! temporary file and renamed into place.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::changeset::ChangeSet;
use crate::entity::EntityKind;
use crate::error::{OntoError, OntoResult, ValidationError};
use crate::iri::Iri;
use crate::ontology::Ontology;
use crate::statement::Statement;
use crate::vocab;
use crate::world::World;

/// Current document format version.
pub const FORMAT_VERSION: u32 = 2;

/// Serialized form of one ontology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyDocument {
    /// Must equal [`FORMAT_VERSION`] to be read back.
    pub format_version: u32,
    /// Identifier of the ontology.
    pub iri: Iri,
    /// When the document was exported.
    pub saved_at: DateTime<Utc>,
    /// Owned statements in insertion order.
    pub statements: Vec<Statement>,
}

impl OntologyDocument {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> OntoResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OntoError::document(format!("serialization failed: {e}")))
    }

    /// Parses a document, rejecting unknown format versions.
    pub fn from_json(json: &str) -> OntoResult<Self> {
        let doc: Self = serde_json::from_str(json)
            .map_err(|e| OntoError::document(format!("invalid document: {e}")))?;
        if doc.format_version != FORMAT_VERSION {
            return Err(OntoError::document(format!(
                "unsupported format version: {} (expected {FORMAT_VERSION})",
                doc.format_version
            )));
        }
        Ok(doc)
    }

    /// File name used under a search path: the last segment of the IRI plus `.json`.
    #[must_use]
    pub fn file_name(iri: &Iri) -> String {
        let segment = iri
            .as_str()
            .trim_end_matches(&['#', '/'][..])
            .rsplit(&['/', ':'][..])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("ontology");
        if segment.ends_with(".json") {
            segment.to_string()
        } else {
            format!("{segment}.json")
        }
    }
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> OntoError {
    OntoError::document(format!("cannot {action} {}: {err}", path.display()))
}

impl World {
    /// Snapshot of the statements owned by `onto`.
    pub fn export_document(&self, onto: &Ontology) -> OntoResult<OntologyDocument> {
        self.require_live(onto)?;
        Ok(OntologyDocument {
            format_version: FORMAT_VERSION,
            iri: onto.iri().clone(),
            saved_at: Utc::now(),
            statements: self.statements_of(onto),
        })
    }

    /// Writes `onto` to `path`.
    pub fn save_to(&self, onto: &Ontology, path: impl AsRef<Path>) -> OntoResult<()> {
        let path = path.as_ref();
        let doc = self.export_document(onto)?;
        let json = doc.to_json()?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| io_error("create", dir, &e))?;
        }
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(|e| io_error("write", &temp_path, &e))?;
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(io_error("rename into", path, &e));
        }

        info!(
            ontology = %onto.iri(),
            path = %path.display(),
            statements = doc.statements.len(),
            "saved ontology"
        );
        Ok(())
    }

    /// Writes `onto` under the first search path, returning the file written.
    pub fn save(&self, onto: &Ontology) -> OntoResult<PathBuf> {
        let dir = self
            .config
            .search_paths
            .first()
            .ok_or_else(|| OntoError::document("no search path configured"))?;
        let path = dir.join(OntologyDocument::file_name(onto.iri()));
        self.save_to(onto, &path)?;
        Ok(path)
    }

    /// Loads the document for `iri` from the search paths.
    ///
    /// # Errors
    /// - `NotFound`: no search path holds a document for `iri`
    pub fn load(&mut self, iri: &str) -> OntoResult<Ontology> {
        let iri = Iri::parse(iri)?;
        let name = OntologyDocument::file_name(&iri);
        let found = self
            .config
            .search_paths
            .iter()
            .map(|dir| dir.join(&name))
            .find(|candidate| candidate.is_file());
        match found {
            Some(path) => self.load_from(path),
            None => Err(OntoError::not_found(format!("document for ontology {iri}"))),
        }
    }

    /// Loads a document from `path`.
    pub fn load_from(&mut self, path: impl AsRef<Path>) -> OntoResult<Ontology> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| io_error("read", path, &e))?;
        let doc = OntologyDocument::from_json(&json)?;
        debug!(path = %path.display(), ontology = %doc.iri, "read ontology document");
        self.import_document(doc)
    }

    /// Checks that every declaration in `doc` is compatible with the world.
    fn validate_document(&self, doc: &OntologyDocument) -> OntoResult<()> {
        let mut declared: HashMap<&Iri, EntityKind> = HashMap::new();
        for st in &doc.statements {
            if !st.subject.is_resource() {
                return Err(ValidationError::LiteralSubject.into());
            }
            if !st.has_predicate(vocab::RDF_TYPE) {
                continue;
            }
            let kind = st
                .object
                .as_iri()
                .and_then(|o| EntityKind::from_declaration(o.as_str()));
            let (Some(kind), Some(subject)) = (kind, st.subject.as_iri()) else {
                continue;
            };
            self.registry.check_kind(subject, kind)?;
            if let Some(existing) = declared.insert(subject, kind) {
                if existing != kind {
                    return Err(OntoError::KindConflict {
                        iri: subject.clone(),
                        existing,
                        requested: kind,
                    });
                }
            }
        }
        Ok(())
    }

    /// Adds an ontology from a parsed document.
    ///
    /// The document is validated before anything is written; a conflicting
    /// declaration fails with `KindConflict` and leaves the world unchanged.
    pub fn import_document(&mut self, doc: OntologyDocument) -> OntoResult<Ontology> {
        if self.ontologies.contains_key(&doc.iri) {
            return Err(OntoError::document(format!(
                "ontology {} is already loaded",
                doc.iri
            )));
        }
        self.validate_document(&doc)?;

        let onto = self.ontology(doc.iri.as_str())?;
        let mut cs = ChangeSet::new();
        for st in doc.statements {
            cs.add(st, onto.id());
        }
        let applied = match cs.apply(self.statements.as_mut()) {
            Ok(applied) => applied,
            Err(err) => {
                self.ontologies.remove(onto.iri());
                return Err(err.into());
            }
        };
        let created = match self.registry.materialize(self.statements.as_ref(), onto.id()) {
            Ok(created) => created,
            Err(err) => {
                self.statements.remove_owned_by(onto.id());
                self.ontologies.remove(onto.iri());
                return Err(err);
            }
        };
        for entity in &created {
            if matches!(entity.kind(), EntityKind::ObjectProperty | EntityKind::DataProperty) {
                self.accessors.register(entity, entity.name());
            }
        }

        let alias = vocab::iri(vocab::ALIAS);
        let aliased: BTreeSet<Iri> = applied
            .added
            .iter()
            .filter(|st| st.predicate == alias)
            .filter_map(|st| st.subject.as_iri().cloned())
            .collect();
        for iri in &aliased {
            self.sync_alias(iri);
        }

        let typed: BTreeSet<Iri> = applied
            .added
            .iter()
            .filter(|st| st.has_predicate(vocab::RDF_TYPE))
            .filter_map(|st| st.subject.as_iri().cloned())
            .collect();
        for iri in typed {
            if let Some(entity) = self.registry.resolve(&iri) {
                if entity.is_individual() {
                    self.refresh_types(&entity);
                }
            }
        }

        info!(
            ontology = %onto.iri(),
            statements = applied.added.len(),
            entities = created.len(),
            aliases = aliased.len(),
            "loaded ontology"
        );
        Ok(onto)
    }
}
