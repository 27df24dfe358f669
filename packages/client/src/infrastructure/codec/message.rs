//! ClientQuery line parsing.
//!
//! A line is a `|`-separated list of records; a record is a space-separated
//! list of `key=value` (or bare `key`) tokens. This layer knows nothing about
//! which keys mean what.

use super::escape::unescape;

/// One `|`-delimited record of a protocol line.
///
/// Keeps insertion order so the first key (the notification name, or
/// `error` for a status line) can be inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    entries: Vec<(String, String)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, overwriting the value of an existing key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// Parse a newline-stripped protocol line into its records.
///
/// An empty line yields no records. Repeated spaces produce empty tokens,
/// which are skipped.
pub fn parse_line(line: &str) -> Vec<Record> {
    if line.is_empty() {
        return Vec::new();
    }

    line.split('|').map(parse_record).collect()
}

fn parse_record(raw: &str) -> Record {
    raw.split(' ')
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once('=') {
            Some((key, value)) => (unescape(key), unescape(value)),
            None => (unescape(token), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_line() {
        // テスト項目: 空行は空のレコード列になる
        // given (前提条件):
        let line = "";

        // when (操作):
        let records = parse_line(line);

        // then (期待する結果):
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_two_records() {
        // テスト項目: パイプで区切られた 2 つのレコードが解析される
        // given (前提条件):
        let line = "a=1 b=2|c=3";

        // when (操作):
        let records = parse_line(line);

        // then (期待する結果):
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::from_iter([("a", "1"), ("b", "2")]));
        assert_eq!(records[1], Record::from_iter([("c", "3")]));
    }

    #[test]
    fn test_parse_bare_token() {
        // テスト項目: '=' を持たないトークンは空文字列の値になる
        // given (前提条件):
        let line = "a";

        // when (操作):
        let records = parse_line(line);

        // then (期待する結果):
        assert_eq!(records, vec![Record::from_iter([("a", "")])]);
    }

    #[test]
    fn test_parse_splits_on_first_equals_and_unescapes() {
        // テスト項目: 最初の '=' で分割され、値がデコードされる
        // given (前提条件):
        let line = "client_nickname=#7\\sBob=x\\pY";

        // when (操作):
        let records = parse_line(line);

        // then (期待する結果):
        assert_eq!(records[0].get("client_nickname"), Some("#7 Bob=x|Y"));
    }

    #[test]
    fn test_parse_duplicate_key_overwrites_in_place() {
        // テスト項目: 重複したキーは後の値で上書きされ、順序は最初の位置を保つ
        // given (前提条件):
        let line = "notifytalkstatuschange status=0 clid=7 status=1";

        // when (操作):
        let records = parse_line(line);

        // then (期待する結果):
        assert_eq!(
            records,
            vec![Record::from_iter([
                ("notifytalkstatuschange", ""),
                ("status", "1"),
                ("clid", "7"),
            ])]
        );
    }

    #[test]
    fn test_parse_skips_empty_tokens() {
        // テスト項目: 連続した空白による空トークンは無視される
        // given (前提条件):
        let line = "error  id=0 msg=ok";

        // when (操作):
        let records = parse_line(line);

        // then (期待する結果):
        assert_eq!(
            records[0],
            Record::from_iter([("error", ""), ("id", "0"), ("msg", "ok")])
        );
    }
}
