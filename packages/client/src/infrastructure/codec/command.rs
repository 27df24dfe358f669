//! Typed ClientQuery command lines.

use std::fmt;

use super::escape::escape;

/// A single command line: a name followed by `key=value` and bare options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    params: Vec<(String, Option<String>)>,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
        }
    }

    /// Append a `key=value` parameter; the value is escaped on rendering.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), Some(value.into())));
        self
    }

    /// Append a bare parameter (e.g., a variable name to fetch).
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.params.push((key.into(), None));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `auth apikey=<key>`
    pub fn auth(api_key: &str) -> Self {
        Self::new("auth").arg("apikey", api_key)
    }

    /// Subscribe to every notification on all server handlers.
    pub fn notify_register_all() -> Self {
        Self::new("clientnotifyregister")
            .arg("schandlerid", "0")
            .arg("event", "any")
    }

    pub fn client_list() -> Self {
        Self::new("clientlist")
    }

    pub fn whoami() -> Self {
        Self::new("whoami")
    }

    /// Fetch the given variables of one participant.
    pub fn client_variable(clid: &str, variables: &[&str]) -> Self {
        variables
            .iter()
            .fold(Self::new("clientvariable").arg("clid", clid), |cmd, var| {
                cmd.flag(*var)
            })
    }

    /// Rename the local participant.
    pub fn update_nickname(nickname: &str) -> Self {
        Self::new("clientupdate").arg("client_nickname", nickname)
    }

    /// Render without the trailing newline; the framing layer adds it.
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        for (key, value) in &self.params {
            match value {
                Some(value) => write!(f, " {}={}", key, escape(value))?,
                None => write!(f, " {}", key)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_nickname_escapes_value() {
        // テスト項目: ニックネームの空白がエスケープされたコマンド行になる
        // given (前提条件):
        let command = Command::update_nickname("#12 Bob");

        // when (操作):
        let line = command.to_line();

        // then (期待する結果):
        assert_eq!(line, "clientupdate client_nickname=#12\\sBob");
    }

    #[test]
    fn test_client_variable_renders_bare_flags() {
        // テスト項目: 取得する変数名が値なしで並ぶ
        // given (前提条件):
        let command = Command::client_variable("5", &["client_nickname"]);

        // when (操作):
        let line = command.to_line();

        // then (期待する結果):
        assert_eq!(line, "clientvariable clid=5 client_nickname");
    }

    #[test]
    fn test_fixed_commands() {
        // テスト項目: 固定コマンドが期待通りに描画される
        // given (前提条件) / when (操作):
        let register = Command::notify_register_all().to_line();
        let auth = Command::auth("ABCD-1234").to_line();

        // then (期待する結果):
        assert_eq!(register, "clientnotifyregister schandlerid=0 event=any");
        assert_eq!(auth, "auth apikey=ABCD-1234");
        assert_eq!(Command::client_list().to_line(), "clientlist");
        assert_eq!(Command::whoami().name(), "whoami");
    }
}
