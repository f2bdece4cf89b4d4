//! Designer controller: owns the current trees, the strategy name and the
//! export format; translates UI gestures into tree operations and HTTP
//! failures into status messages. All guards run *before* any mutation, so
//! a rejected gesture leaves the forests untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog;
use crate::client::{EndpointError, SaveRequest, StrategyEndpoint};
use crate::import::ImportResult;
use crate::serialize::{self, ExportFormat};
use crate::tree::{self, Config, Forest, IdGen, Section};
use crate::validator::{self, Validation};

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Info(String),
    Success(String),
    Saving(String),
    Error(String),
}

/// A palette drop or click. `target_id == None` appends at the forest root.
#[derive(Debug, Clone)]
pub struct DropPayload {
    pub section: Section,
    pub target_id: Option<String>,
    pub block: String,
}

/// Everything the UI derives from the current trees; recomputed on change.
#[derive(Debug, Clone)]
pub struct Derived {
    pub validation: Validation,
    pub yaml: String,
    pub python: String,
}

pub struct Designer {
    pub name: String,
    pub format: ExportFormat,
    conditions: Forest,
    actions: Forest,
    status: Status,
    ids: Box<dyn IdGen>,
    endpoint: Arc<dyn StrategyEndpoint>,
    save_seq: AtomicU64,
}

impl Designer {
    pub fn new(endpoint: Arc<dyn StrategyEndpoint>, ids: Box<dyn IdGen>) -> Self {
        Self {
            name: String::new(),
            format: ExportFormat::Yaml,
            conditions: Vec::new(),
            actions: Vec::new(),
            status: Status::Idle,
            ids,
            endpoint,
            save_seq: AtomicU64::new(0),
        }
    }

    pub fn conditions(&self) -> &Forest {
        &self.conditions
    }

    pub fn actions(&self) -> &Forest {
        &self.actions
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    fn forest(&self, section: Section) -> &Forest {
        match section {
            Section::Conditions => &self.conditions,
            Section::Actions => &self.actions,
        }
    }

    fn forest_mut(&mut self, section: Section) -> &mut Forest {
        match section {
            Section::Conditions => &mut self.conditions,
            Section::Actions => &mut self.actions,
        }
    }

    // -----------------------------------------------------------------------
    // UI gestures
    // -----------------------------------------------------------------------

    pub fn on_drop(&mut self, payload: DropPayload) {
        let Some(bt) = catalog::block_type(&payload.block) else {
            self.status = Status::Error("Type de bloc inconnu.".to_string());
            return;
        };
        if bt.category != payload.section {
            self.status = Status::Error(format!(
                "Le bloc « {} » ne peut pas être utilisé dans cette section.",
                bt.label
            ));
            return;
        }
        if let Some(target_id) = payload.target_id.as_deref() {
            let Some(target) = tree::find(self.forest(payload.section), target_id) else {
                self.status = Status::Error("Cible introuvable.".to_string());
                return;
            };
            let accepts = catalog::block_type(&target.block)
                .map(|t| t.accepts)
                .unwrap_or(&[]);
            if !accepts.contains(&payload.block.as_str()) {
                self.status =
                    Status::Error("La cible ne peut pas contenir ce type de bloc.".to_string());
                return;
            }
        }
        let label = bt.label;
        let node = tree::create(&payload.block, self.ids.as_mut());
        let next = tree::append(
            self.forest(payload.section),
            payload.target_id.as_deref(),
            node,
        );
        *self.forest_mut(payload.section) = next;
        self.status = Status::Success(format!("{label} ajouté."));
    }

    /// Palette click — same as a drop at the forest root.
    pub fn on_add(&mut self, block: &str, section: Section) {
        self.on_drop(DropPayload {
            section,
            target_id: None,
            block: block.to_string(),
        });
    }

    /// Replace a node's configuration. No eager validation — derived state
    /// is recomputed from the tree. A stale id is a no-op.
    pub fn on_config_change(&mut self, section: Section, node_id: &str, config: Config) {
        let next = tree::update_config(self.forest(section), node_id, |n| {
            let mut n = n.clone();
            n.config = config.clone();
            n
        });
        *self.forest_mut(section) = next;
    }

    pub fn on_remove(&mut self, section: Section, node_id: &str) {
        let next = tree::remove(self.forest(section), node_id);
        *self.forest_mut(section) = next;
        self.status = Status::Info("Bloc supprimé.".to_string());
    }

    /// Replace the whole editor state with an imported strategy.
    pub fn load_import(&mut self, result: ImportResult) {
        self.name = result.name;
        self.format = result.format;
        self.conditions = result.conditions;
        self.actions = result.actions;
        self.status = if result.errors.is_empty() {
            Status::Info("Stratégie importée.".to_string())
        } else {
            Status::Error(result.errors.join(" "))
        };
    }

    pub fn reset(&mut self) {
        self.name.clear();
        self.conditions.clear();
        self.actions.clear();
        self.status = Status::Idle;
    }

    // -----------------------------------------------------------------------
    // Derived state
    // -----------------------------------------------------------------------

    pub fn document(&self) -> serde_json::Value {
        serialize::build_document(&self.name, &self.conditions, &self.actions)
    }

    pub fn export_code(&self) -> String {
        let doc = self.document();
        match self.format {
            ExportFormat::Yaml => serialize::to_yaml(&doc),
            ExportFormat::Python => serialize::to_python(&doc),
        }
    }

    pub fn derived(&self) -> Derived {
        let doc = self.document();
        Derived {
            validation: validator::validate(&self.conditions, &self.actions),
            yaml: serialize::to_yaml(&doc),
            python: serialize::to_python(&doc),
        }
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    pub async fn save(&mut self) {
        let Some((seq, request)) = self.begin_save() else {
            return;
        };
        let result = self.endpoint.clone().save(&request).await;
        self.finish_save(seq, result);
    }

    /// Run the pre-flight guards, move to `Saving` and build the request.
    /// Each call invalidates the replies of earlier in-flight saves.
    fn begin_save(&mut self) -> Option<(u64, SaveRequest)> {
        if self.name.trim().is_empty() {
            self.status = Status::Error("Le nom de la stratégie est obligatoire.".to_string());
            return None;
        }
        let validation = validator::validate(&self.conditions, &self.actions);
        if !validation.is_valid {
            self.status = Status::Error(
                "Corrigez les erreurs de configuration avant de sauvegarder.".to_string(),
            );
            return None;
        }
        let seq = self.save_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.status = Status::Saving("Enregistrement en cours…".to_string());
        Some((
            seq,
            SaveRequest {
                name: self.name.trim().to_string(),
                format: self.format,
                code: self.export_code(),
            },
        ))
    }

    /// Apply a save reply, unless a newer save superseded it.
    fn finish_save(&mut self, seq: u64, result: Result<(), EndpointError>) {
        if self.save_seq.load(Ordering::SeqCst) != seq {
            debug!(seq, "strategy_save_reply_discarded");
            return;
        }
        match result {
            Ok(()) => {
                info!(name = %self.name, "strategy_save_ok");
                self.status = Status::Success("Stratégie enregistrée avec succès.".to_string());
            }
            Err(e) => {
                self.status = Status::Error(e.to_string());
            }
        }
    }
}
