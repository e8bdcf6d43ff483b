/// Audit ledger — how often each phrase of each snippet has been chosen.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::schema::spec::Spec;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLedger {
    counts: FxHashMap<String, FxHashMap<String, u64>>,
}

/// One snippet's phrase counts, busiest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetAudit {
    pub snippet: String,
    pub phrases: Vec<(String, u64)>,
}

impl AuditLedger {
    /// A ledger with a zero count for every phrase in `spec`.
    pub fn new(spec: &Spec) -> Self {
        let counts = spec
            .snippets
            .iter()
            .map(|(name, snippet)| {
                let phrases = snippet
                    .groups
                    .iter()
                    .flat_map(|g| g.phrases.iter())
                    .map(|p| (p.clone(), 0))
                    .collect();
                (name.clone(), phrases)
            })
            .collect();
        AuditLedger { counts }
    }

    pub fn record(&mut self, snippet: &str, phrase: &str) {
        *self
            .counts
            .entry(snippet.to_string())
            .or_default()
            .entry(phrase.to_string())
            .or_default() += 1;
    }

    pub fn count(&self, snippet: &str, phrase: &str) -> Option<u64> {
        self.counts.get(snippet)?.get(phrase).copied()
    }

    pub fn snippet(&self, snippet: &str) -> Option<&FxHashMap<String, u64>> {
        self.counts.get(snippet)
    }

    /// Zero every counter, keeping the phrase list.
    pub fn reset(&mut self) {
        for phrases in self.counts.values_mut() {
            phrases.values_mut().for_each(|c| *c = 0);
        }
    }

    /// `(snippet, phrase)` pairs never chosen, sorted.
    pub fn unused(&self) -> Vec<(String, String)> {
        let mut unused: Vec<(String, String)> = self
            .counts
            .iter()
            .flat_map(|(snippet, phrases)| {
                phrases
                    .iter()
                    .filter(|(_, c)| **c == 0)
                    .map(move |(p, _)| (snippet.clone(), p.clone()))
            })
            .collect();
        unused.sort();
        unused
    }

    /// Snippets by name; within each, phrases by descending count.
    pub fn report(&self) -> Vec<SnippetAudit> {
        let mut report: Vec<SnippetAudit> = self
            .counts
            .iter()
            .map(|(snippet, phrases)| {
                let mut phrases: Vec<(String, u64)> =
                    phrases.iter().map(|(p, c)| (p.clone(), *c)).collect();
                phrases.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                SnippetAudit {
                    snippet: snippet.clone(),
                    phrases,
                }
            })
            .collect();
        report.sort_by(|a, b| a.snippet.cmp(&b.snippet));
        report
    }
}

impl fmt::Display for AuditLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.report() {
            writeln!(f, "{}", entry.snippet)?;
            for (phrase, count) in &entry.phrases {
                writeln!(f, "\t{} :: {}", phrase, count)?;
            }
        }
        Ok(())
    }
}
