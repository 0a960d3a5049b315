//! Verification records and certificates
//!
//! Every agent that survives the proof gate carries a [`ProofRecord`]: the
//! per-check results, a serialised payload, and a SHA-256 digest that makes
//! the record tamper-evident. [`render_certificate`] turns a verified agent
//! into a deterministic plain-text certificate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::agent::Agent;

/// A SHA-256 digest (32 bytes).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDigest(pub [u8; 32]);

impl ProofDigest {
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ProofDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofDigest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ProofDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Outcome of a single gate check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub value: f64,
    pub threshold: Option<f64>,
    pub message: String,
}

/// The verification record the gate attaches to a surviving agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofRecord {
    pub id: String,
    /// One-line summary of what was verified.
    pub summary: String,
    /// Check results in canonical gate order.
    pub checks: Vec<CheckResult>,
    /// Serialised check list (JSON).
    pub payload: String,
    /// SHA-256 over the payload.
    pub digest: ProofDigest,
    pub verified: bool,
    pub verified_at: DateTime<Utc>,
}

impl ProofRecord {
    pub fn new(summary: String, checks: Vec<CheckResult>, verified: bool) -> Self {
        let payload = serde_json::to_string(&checks).unwrap_or_else(|_| "[]".to_string());
        let digest = ProofDigest::digest(payload.as_bytes());
        Self {
            id: format!("proof-{}", &Uuid::new_v4().to_string()[..8]),
            summary,
            checks,
            payload,
            digest,
            verified,
            verified_at: Utc::now(),
        }
    }

    /// True iff the payload still matches its digest.
    pub fn digest_matches(&self) -> bool {
        ProofDigest::digest(self.payload.as_bytes()) == self.digest
    }
}

/// Render a verified agent as a plain-text certificate block.
///
/// Deterministic for a given agent and record. Agents without a proof
/// render as `"No proof certificate available"`.
pub fn render_certificate(agent: &Agent) -> String {
    let Some(proof) = agent.proof.as_ref() else {
        return "No proof certificate available".to_string();
    };

    let bar = "═".repeat(52);
    let mut out = String::new();
    out.push_str(&bar);
    out.push('\n');
    out.push_str("           PROOF-CARRYING AGENT CERTIFICATE\n");
    out.push_str(&bar);
    out.push('\n');
    out.push_str(&format!("Agent:       {}\n", agent.id));
    out.push_str(&format!("Kind:        {}\n", agent.kind));
    out.push_str(&format!("Generation:  {}\n", agent.generation));
    out.push_str(&format!("Verified:    {}\n", proof.verified));
    out.push_str(&format!(
        "Verified at: {}\n",
        proof.verified_at.to_rfc3339()
    ));
    out.push_str(&format!("Summary:     {}\n", proof.summary));
    out.push_str("Checks:\n");
    for check in &proof.checks {
        let marker = if check.passed { "✓" } else { "✗" };
        match check.threshold {
            Some(threshold) => out.push_str(&format!(
                "  {} {:<14} {:.4} vs {:.4}: {}\n",
                marker, check.name, check.value, threshold, check.message
            )),
            None => out.push_str(&format!(
                "  {} {:<14} {:.4}: {}\n",
                marker, check.name, check.value, check.message
            )),
        }
    }
    out.push_str(&format!("Digest:      {}\n", proof.digest.to_hex()));
    out.push_str(&format!("Lineage:     {}\n", agent.lineage.join(" -> ")));
    out.push_str(&bar);
    out.push('\n');
    out
}
