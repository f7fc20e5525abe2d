//! Query-hint extraction and splicing.
//!
//! Hints travel from the ORM pipeline to this layer through a textual
//! comment channel: a marker comment block appended to the generated SQL.
//! Immediately before execution the block is extracted, validated, and the
//! hints are re-spliced into the positions where Spanner expects them —
//! statement hints directly before the statement text, table hints directly
//! after the table token in FROM/JOIN clauses.
//!
//! The comment block grammar:
//!
//! ```text
//! /*@hints
//! statement: @{OPTIMIZER_VERSION=1}
//! table Singers: @{FORCE_INDEX=SingersByFirstName}
//! */
//! ```
//!
//! Handling is deliberately lenient: a directive line matching neither
//! grammar is skipped (logged, never an error), and a table directive whose
//! token does not occur in the statement is dropped. Both are logged through
//! `tracing::warn!` so a typo'd table name is at least visible.

use tracing::warn;

/// Marker that opens a hint comment block.
pub const HINT_MARKER: &str = "/*@hints";

/// Structured hints for one statement.
///
/// Built by the caller before the statement is prepared and consumed exactly
/// once during splicing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintSpec {
    statement_hints: Vec<String>,
    table_hints: Vec<(String, String)>,
}

impl HintSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement-level hint, e.g. `@{OPTIMIZER_VERSION=1}`.
    #[must_use]
    pub fn statement_hint(mut self, hint: impl Into<String>) -> Self {
        self.statement_hints.push(hint.into());
        self
    }

    /// Add a table hint for a table name or alias token, e.g.
    /// `@{FORCE_INDEX=SingersByFirstName}` on `Singers`.
    #[must_use]
    pub fn table_hint(mut self, table: impl Into<String>, hint: impl Into<String>) -> Self {
        self.table_hints.push((table.into(), hint.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.statement_hints.is_empty() && self.table_hints.is_empty()
    }

    pub fn statement_hints(&self) -> &[String] {
        &self.statement_hints
    }

    pub fn table_hints(&self) -> &[(String, String)] {
        &self.table_hints
    }

    /// Fold another spec's hints into this one, preserving declaration order.
    pub fn merge(&mut self, other: HintSpec) {
        self.statement_hints.extend(other.statement_hints);
        self.table_hints.extend(other.table_hints);
    }

    /// Render the comment block the ORM pipeline embeds into generated SQL.
    ///
    /// Returns an empty string when there is nothing to emit.
    pub fn to_comment(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut out = String::from(HINT_MARKER);
        out.push('\n');
        for hint in &self.statement_hints {
            out.push_str("statement: ");
            out.push_str(hint);
            out.push('\n');
        }
        for (table, hint) in &self.table_hints {
            out.push_str("table ");
            out.push_str(table);
            out.push_str(": ");
            out.push_str(hint);
            out.push('\n');
        }
        out.push_str("*/");
        out
    }
}

/// Extract the hint comment block from `sql`, if present.
///
/// Returns the SQL with exactly the marker comment removed, plus the parsed
/// hints. Without a marker the SQL passes through unchanged. A marker block
/// with zero directives is stripped and contributes nothing.
pub fn extract(sql: &str) -> (String, HintSpec) {
    let Some(start) = sql.find(HINT_MARKER) else {
        return (sql.to_string(), HintSpec::new());
    };
    let Some(end_rel) = sql[start..].find("*/") else {
        warn!("unterminated hint comment block; statement left unchanged");
        return (sql.to_string(), HintSpec::new());
    };
    let end = start + end_rel + "*/".len();

    let body = &sql[start + HINT_MARKER.len()..start + end_rel];
    let mut spec = HintSpec::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("statement:") {
            let hint = rest.trim();
            if hint.is_empty() {
                warn!(directive = line, "empty statement-hint directive ignored");
                continue;
            }
            spec.statement_hints.push(hint.to_string());
        } else if let Some(rest) = line.strip_prefix("table ") {
            match rest.split_once(':') {
                Some((table, hint)) if !table.trim().is_empty() && !hint.trim().is_empty() => {
                    spec.table_hints
                        .push((table.trim().to_string(), hint.trim().to_string()));
                }
                _ => warn!(directive = line, "malformed table-hint directive ignored"),
            }
        } else {
            // Malformed line: skip it, keep processing the rest of the block.
            warn!(directive = line, "unrecognized hint directive ignored");
        }
    }

    let mut remaining = String::with_capacity(sql.len() - (end - start));
    remaining.push_str(&sql[..start]);
    remaining.push_str(&sql[end..]);
    (remaining, spec)
}

/// Splice hints into a statement.
///
/// Statement hints are prefixed in reverse declaration order, the
/// most-recently-added hint closest to the SQL text. Table hints are
/// inserted directly after each occurrence of the matching table/alias token
/// inside FROM/JOIN clauses; a directive whose token does not occur is
/// dropped.
pub fn splice(sql: &str, spec: &HintSpec) -> String {
    let mut out = splice_table_hints(sql, &spec.table_hints);

    // Prefixing in declaration order leaves the first-declared hint closest
    // to the SQL text, i.e. reverse declaration order reading left to right.
    for hint in &spec.statement_hints {
        out.insert_str(0, hint);
    }
    out
}

/// Extract any embedded hint block, merge with `extra`, and splice.
///
/// This is the whole interceptor as one pass, applied immediately before
/// execution.
pub fn apply(sql: &str, extra: Option<&HintSpec>) -> String {
    let (base, mut spec) = extract(sql);
    if let Some(extra) = extra {
        spec.merge(extra.clone());
    }
    if spec.is_empty() {
        return base;
    }
    splice(&base, &spec)
}

// ─── FROM/JOIN tokenizer ────────────────────────────────────────────────────

fn is_word_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Keywords that open a table scope: the identifiers that follow name tables
/// (and their aliases) until the scope is closed again.
fn opens_table_scope(word: &str) -> bool {
    word.eq_ignore_ascii_case("FROM") || word.eq_ignore_ascii_case("JOIN")
}

/// Keywords that close a table scope.
fn closes_table_scope(word: &str) -> bool {
    const CLOSERS: &[&str] = &[
        "WHERE", "ON", "USING", "GROUP", "ORDER", "HAVING", "LIMIT", "SET", "SELECT", "VALUES",
        "UNION", "INTERSECT", "EXCEPT", "WINDOW",
    ];
    CLOSERS.iter().any(|k| word.eq_ignore_ascii_case(k))
}

/// Scan the SQL and splice each table hint after every occurrence of its
/// token within FROM/JOIN clauses.
///
/// The scan tokenizes rather than pattern-matches, so `Singers` never
/// matches inside `SingersArchive`, string literals, quoted identifiers,
/// comments, or `@param` references.
fn splice_table_hints(sql: &str, table_hints: &[(String, String)]) -> String {
    if table_hints.is_empty() {
        return sql.to_string();
    }

    // (byte offset, hint text) insertion points, discovered in order.
    let mut insertions: Vec<(usize, &str)> = Vec::new();
    let mut matched = vec![false; table_hints.len()];

    let bytes = sql.as_bytes();
    let mut i = 0;
    let mut in_table_scope = false;

    while i < bytes.len() {
        let c = bytes[i] as char;

        // Line comment.
        if c == '-' && bytes.get(i + 1) == Some(&b'-') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        // Block comment.
        if c == '/' && bytes.get(i + 1) == Some(&b'*') {
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
            continue;
        }
        // String literal (backslash and doubled-quote escapes).
        if c == '\'' {
            i += 1;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    b'\'' => {
                        if bytes.get(i + 1) == Some(&b'\'') {
                            i += 2;
                        } else {
                            i += 1;
                            break;
                        }
                    }
                    _ => i += 1,
                }
            }
            continue;
        }
        // Quoted identifier.
        if c == '`' {
            i += 1;
            while i < bytes.len() && bytes[i] != b'`' {
                i += 1;
            }
            i = (i + 1).min(bytes.len());
            continue;
        }
        // Parameter reference: skip '@' together with its name so parameter
        // names never register as table tokens.
        if c == '@' {
            i += 1;
            while i < bytes.len() && is_word_char(bytes[i] as char) {
                i += 1;
            }
            continue;
        }
        // Word token.
        if is_word_start(c) {
            let start = i;
            while i < bytes.len() && is_word_char(bytes[i] as char) {
                i += 1;
            }
            let word = &sql[start..i];

            if opens_table_scope(word) {
                in_table_scope = true;
            } else if closes_table_scope(word) {
                in_table_scope = false;
            } else if in_table_scope {
                for (hint_idx, (table, hint)) in table_hints.iter().enumerate() {
                    if word == table {
                        insertions.push((i, hint));
                        matched[hint_idx] = true;
                    }
                }
            }
            continue;
        }

        i += 1;
    }

    for (hint_idx, (table, _)) in table_hints.iter().enumerate() {
        if !matched[hint_idx] {
            warn!(table = %table, "table hint dropped: token not present in statement");
        }
    }

    let mut out = String::with_capacity(sql.len() + insertions.len() * 16);
    let mut prev = 0;
    for (offset, hint) in insertions {
        out.push_str(&sql[prev..offset]);
        out.push_str(hint);
        prev = offset;
    }
    out.push_str(&sql[prev..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_marker_passes_through() {
        let sql = "SELECT * FROM Singers";
        let (out, spec) = extract(sql);
        assert_eq!(out, sql);
        assert!(spec.is_empty());
    }

    #[test]
    fn empty_block_is_stripped_only() {
        let sql = "SELECT * FROM Singers /*@hints\n*/";
        let (out, spec) = extract(sql);
        assert_eq!(out, "SELECT * FROM Singers ");
        assert!(spec.is_empty());
    }

    #[test]
    fn extracts_statement_and_table_directives() {
        let sql = "SELECT * FROM Singers\n/*@hints\nstatement: @{OPTIMIZER_VERSION=1}\ntable Singers: @{FORCE_INDEX=SingersByFirstName}\n*/";
        let (out, spec) = extract(sql);
        assert_eq!(out, "SELECT * FROM Singers\n");
        assert_eq!(spec.statement_hints(), ["@{OPTIMIZER_VERSION=1}"]);
        assert_eq!(
            spec.table_hints(),
            [(
                "Singers".to_string(),
                "@{FORCE_INDEX=SingersByFirstName}".to_string()
            )]
        );
    }

    #[test]
    fn malformed_directive_skipped_rest_processed() {
        let sql = "SELECT 1 /*@hints\nnonsense line\nstatement: @{A=1}\n*/";
        let (_, spec) = extract(sql);
        assert_eq!(spec.statement_hints(), ["@{A=1}"]);
    }

    #[test]
    fn statement_hints_splice_in_reverse_declaration_order() {
        let spec = HintSpec::new()
            .statement_hint("@{OPTIMIZER_VERSION=1}")
            .statement_hint("@{USE_ADDITIONAL_PARALLELISM=TRUE}");
        let out = splice("SELECT * FROM Singers", &spec);
        assert_eq!(
            out,
            "@{USE_ADDITIONAL_PARALLELISM=TRUE}@{OPTIMIZER_VERSION=1}SELECT * FROM Singers"
        );
    }

    #[test]
    fn table_hint_splices_after_table_token() {
        let spec = HintSpec::new().table_hint("Singers", "@{FORCE_INDEX=SingersByFirstName}");
        let out = splice("SELECT s.FirstName FROM Singers WHERE s.SingerId = @p1", &spec);
        assert_eq!(
            out,
            "SELECT s.FirstName FROM Singers@{FORCE_INDEX=SingersByFirstName} WHERE s.SingerId = @p1"
        );
    }

    #[test]
    fn table_hint_splices_every_occurrence() {
        let spec = HintSpec::new().table_hint("Singers", "@{FORCE_INDEX=I}");
        let out = splice(
            "SELECT * FROM Singers JOIN Singers ON Singers.SingerId = 1",
            &spec,
        );
        // Both FROM/JOIN occurrences get the hint; the ON reference does not.
        assert_eq!(
            out,
            "SELECT * FROM Singers@{FORCE_INDEX=I} JOIN Singers@{FORCE_INDEX=I} ON Singers.SingerId = 1"
        );
    }

    #[test]
    fn table_hint_respects_word_boundaries() {
        let spec = HintSpec::new().table_hint("Singers", "@{FORCE_INDEX=I}");
        let out = splice("SELECT * FROM SingersArchive", &spec);
        assert_eq!(out, "SELECT * FROM SingersArchive");
    }

    #[test]
    fn table_hint_ignores_select_list_and_strings() {
        let spec = HintSpec::new().table_hint("Singers", "@{H}");
        let out = splice("SELECT 'Singers', Singers.Name FROM Albums", &spec);
        assert_eq!(out, "SELECT 'Singers', Singers.Name FROM Albums");
    }

    #[test]
    fn unknown_table_token_is_dropped_others_still_apply() {
        let spec = HintSpec::new()
            .table_hint("Nope", "@{A}")
            .table_hint("Albums", "@{B}");
        let out = splice("SELECT * FROM Albums", &spec);
        assert_eq!(out, "SELECT * FROM Albums@{B}");
    }

    #[test]
    fn alias_token_matches() {
        let spec = HintSpec::new().table_hint("a", "@{FORCE_INDEX=AlbumsByTitle}");
        let out = splice("SELECT a.Title FROM Albums a WHERE a.Title != ''", &spec);
        assert_eq!(
            out,
            "SELECT a.Title FROM Albums a@{FORCE_INDEX=AlbumsByTitle} WHERE a.Title != ''"
        );
    }

    #[test]
    fn join_scope_ends_at_on() {
        let spec = HintSpec::new().table_hint("AlbumId", "@{H}");
        let out = splice(
            "SELECT * FROM Albums JOIN Tracks ON Tracks.AlbumId = Albums.AlbumId",
            &spec,
        );
        assert_eq!(
            out,
            "SELECT * FROM Albums JOIN Tracks ON Tracks.AlbumId = Albums.AlbumId"
        );
    }

    #[test]
    fn apply_extracts_and_splices_end_to_end() {
        let spec = HintSpec::new()
            .statement_hint("@{OPTIMIZER_VERSION=1}")
            .table_hint("Singers", "@{FORCE_INDEX=SingersByFirstName}");
        let mut sql = String::from("SELECT FirstName FROM Singers ");
        sql.push_str(&spec.to_comment());

        let out = apply(&sql, None);
        assert_eq!(
            out,
            "@{OPTIMIZER_VERSION=1}SELECT FirstName FROM Singers@{FORCE_INDEX=SingersByFirstName} "
        );
    }

    #[test]
    fn to_comment_round_trips_through_extract() {
        let spec = HintSpec::new()
            .statement_hint("@{A=1}")
            .statement_hint("@{B=2}")
            .table_hint("T", "@{C=3}");
        let sql = format!("SELECT 1 {}", spec.to_comment());
        let (out, parsed) = extract(&sql);
        assert_eq!(out, "SELECT 1 ");
        assert_eq!(parsed, spec);
    }

    #[test]
    fn apply_merges_structured_hints_with_embedded_block() {
        let sql = "SELECT * FROM Albums /*@hints\nstatement: @{A=1}\n*/";
        let extra = HintSpec::new().statement_hint("@{B=2}");
        let out = apply(sql, Some(&extra));
        // Embedded first, structured second; reverse order puts B before A.
        assert_eq!(out, "@{B=2}@{A=1}SELECT * FROM Albums ");
    }
}
