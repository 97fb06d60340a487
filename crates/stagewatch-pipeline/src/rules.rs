//! Stage rule tables.
//!
//! A rule table maps every stage to a start pattern and optional end and
//! fail patterns. Tables are immutable once built and are passed to the
//! classifier explicitly, so different pipeline types can bring their own.

use std::path::Path;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RuleError;
use crate::stage::{StageId, STAGE_COUNT};

/// Something that can decide whether a log line matches.
pub trait LinePattern: Send + Sync + std::fmt::Debug {
    /// Whether `line` matches.
    fn matches(&self, line: &str) -> bool;

    /// Source text of the pattern, used for fingerprints and export.
    fn source(&self) -> &str;
}

impl LinePattern for Regex {
    fn matches(&self, line: &str) -> bool {
        self.is_match(line)
    }

    fn source(&self) -> &str {
        self.as_str()
    }
}

/// Patterns for one stage.
#[derive(Debug, Clone)]
pub struct StageRule {
    pub start: Arc<dyn LinePattern>,
    pub end: Option<Arc<dyn LinePattern>>,
    pub fail: Option<Arc<dyn LinePattern>>,
}

impl StageRule {
    pub fn new(start: impl LinePattern + 'static) -> Self {
        Self {
            start: Arc::new(start),
            end: None,
            fail: None,
        }
    }

    pub fn with_end(mut self, end: impl LinePattern + 'static) -> Self {
        self.end = Some(Arc::new(end));
        self
    }

    pub fn with_fail(mut self, fail: impl LinePattern + 'static) -> Self {
        self.fail = Some(Arc::new(fail));
        self
    }

    pub fn starts(&self, line: &str) -> bool {
        self.start.matches(line)
    }

    pub fn ends(&self, line: &str) -> bool {
        self.end.as_ref().is_some_and(|p| p.matches(line))
    }

    pub fn fails(&self, line: &str) -> bool {
        self.fail.as_ref().is_some_and(|p| p.matches(line))
    }
}

/// Serializable form of one stage's rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageRuleConfig {
    pub stage: StageId,
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
}

/// Serializable form of a whole rule table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSetConfig {
    pub stages: Vec<StageRuleConfig>,
}

impl RuleSetConfig {
    /// The builtin table for container deployments.
    pub fn builtin() -> Self {
        let rule = |stage, start: &str, end: Option<&str>, fail: Option<&str>| StageRuleConfig {
            stage,
            start: start.to_string(),
            end: end.map(str::to_string),
            fail: fail.map(str::to_string),
        };

        Self {
            stages: vec![
                rule(
                    StageId::Prepare,
                    r"starting deployment|deployment (queued|started)|preparing|initiali[sz]ing",
                    None,
                    Some(r"preparation failed|failed to prepare"),
                ),
                rule(
                    StageId::Clone,
                    r"cloning|git clone|fetching (repository|source)",
                    Some(r"clone (complete|completed|finished|done)|cloned|commit sha"),
                    Some(r"clone failed|fatal: (repository|could not)|could not read from remote"),
                ),
                rule(
                    StageId::Build,
                    r"docker build|building|build started|running build|npm run build",
                    Some(r"build (complete|completed|succeeded|finished)|successfully built"),
                    Some(r"build failed|failed to build|error building|returned a non-zero code"),
                ),
                rule(
                    StageId::Push,
                    r"pushing|docker push|uploading image",
                    Some(r"push (complete|completed|succeeded|finished)|pushed|digest: sha256"),
                    Some(r"push failed|failed to push|denied: requested access"),
                ),
                rule(
                    StageId::Deploy,
                    r"deploying|starting container|rolling (out|update)|creating (service|container)",
                    Some(r"deploy(ment)? (complete|completed|succeeded|successful|finished)|container started|rollout complete"),
                    Some(r"deploy(ment)? failed|rollout failed|crashloopbackoff|failed to start container"),
                ),
                rule(
                    StageId::Healthcheck,
                    r"health ?check|waiting for .*healthy|readiness probe",
                    Some(r"health ?check (passed|succeeded|ok)|is healthy|all checks passed"),
                    Some(r"health ?check failed|unhealthy|readiness probe failed"),
                ),
            ],
        }
    }
}

/// Immutable stage rule table, indexed by stage.
#[derive(Debug, Clone)]
pub struct StageRuleSet {
    rules: Vec<StageRule>,
}

impl StageRuleSet {
    /// Build a table from one rule per stage, in any order.
    pub fn new(rules: Vec<(StageId, StageRule)>) -> Result<Self, RuleError> {
        let mut slots: Vec<Option<StageRule>> = vec![None; STAGE_COUNT];

        for (stage, rule) in rules {
            let slot = &mut slots[stage.index()];
            if slot.is_some() {
                return Err(RuleError::DuplicateStage(stage));
            }
            *slot = Some(rule);
        }

        let rules = slots
            .into_iter()
            .zip(StageId::ALL)
            .map(|(slot, stage)| slot.ok_or(RuleError::MissingStage(stage)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// The builtin table.
    pub fn builtin() -> Self {
        // Builtin patterns are constant and exercised by the test suite.
        Self::from_config(&RuleSetConfig::builtin()).expect("builtin rule table compiles")
    }

    /// Compile a serialized table. Patterns are case-insensitive unless
    /// they override it with an inline flag.
    pub fn from_config(config: &RuleSetConfig) -> Result<Self, RuleError> {
        let rules = config
            .stages
            .iter()
            .map(|cfg| {
                let mut rule = StageRule::new(compile(cfg.stage, "start", &cfg.start)?);
                if let Some(end) = &cfg.end {
                    rule = rule.with_end(compile(cfg.stage, "end", end)?);
                }
                if let Some(fail) = &cfg.fail {
                    rule = rule.with_fail(compile(cfg.stage, "fail", fail)?);
                }
                Ok((cfg.stage, rule))
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        Self::new(rules)
    }

    /// Parse and compile a JSON rule table.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let config: RuleSetConfig = serde_json::from_str(json)?;
        Self::from_config(&config)
    }

    /// Load a JSON rule table from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Rule for `stage`.
    pub fn rule(&self, stage: StageId) -> &StageRule {
        &self.rules[stage.index()]
    }

    /// Rules in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (StageId, &StageRule)> {
        StageId::ALL.into_iter().zip(self.rules.iter())
    }

    /// Export the pattern sources.
    pub fn to_config(&self) -> RuleSetConfig {
        RuleSetConfig {
            stages: self
                .iter()
                .map(|(stage, rule)| StageRuleConfig {
                    stage,
                    start: rule.start.source().to_string(),
                    end: rule.end.as_ref().map(|p| p.source().to_string()),
                    fail: rule.fail.as_ref().map(|p| p.source().to_string()),
                })
                .collect(),
        }
    }

    /// SHA-256 over the ordered pattern sources.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (stage, rule) in self.iter() {
            hasher.update(stage.name().as_bytes());
            hasher.update(b"\0");
            for pattern in [Some(&rule.start), rule.end.as_ref(), rule.fail.as_ref()] {
                if let Some(p) = pattern {
                    hasher.update(p.source().as_bytes());
                }
                hasher.update(b"\0");
            }
        }
        hex::encode(hasher.finalize())
    }
}

impl Default for StageRuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

fn compile(stage: StageId, kind: &'static str, pattern: &str) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| RuleError::InvalidPattern {
            stage,
            kind,
            pattern: pattern.to_string(),
            source,
        })
}
