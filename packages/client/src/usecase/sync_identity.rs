//! UseCase: ローカル参加者のニックネーム同期
//!
//! ホストアプリケーションから渡された参加者番号（と任意で表示名）を
//! ニックネームの先頭に埋め込みます。同じ識別情報を二度送ることはありません。

use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    domain::{IdentityKey, IdentityState, QueryError, compute_nickname},
    infrastructure::codec::{Command, Record},
};

use super::session::{QuerySession, Reply};

const NICKNAME_VARIABLE: &str = "client_nickname";

/// ニックネーム同期のユースケース
pub struct SyncIdentityUseCase {
    /// 呼び出し側スレッドが `update()` で書き込む識別情報
    identity: Arc<Mutex<IdentityState>>,
    /// 表示名もニックネームに含めるか
    push_name: bool,
}

impl SyncIdentityUseCase {
    pub fn new(identity: Arc<Mutex<IdentityState>>, push_name: bool) -> Self {
        Self {
            identity,
            push_name,
        }
    }

    /// 識別情報が前回の同期から変わっていれば、ニックネームを計算して送信
    ///
    /// 問い合わせや更新が時間内に終わらない場合は何も記録せず、次の周回で
    /// 遅れて届いた応答を受け取ります（同じコマンドは再送されません）。
    pub async fn execute(&self, session: &mut QuerySession) -> Result<(), QueryError> {
        let identity = self
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let key = identity.sync_key(self.push_name);
        if session.context.last_pushed.as_ref() == Some(&key) {
            return Ok(());
        }

        let Some(own_id) = self.own_client_id(session, &key).await? else {
            return Ok(());
        };
        let Some(current) = self.current_nickname(session, &own_id, &key).await? else {
            return Ok(());
        };

        let nickname = compute_nickname(&current, &identity, self.push_name);
        if nickname == current {
            tracing::debug!("Nickname '{}' already up to date", current);
            session.context.last_pushed = Some(key);
            return Ok(());
        }

        match session.execute(&Command::update_nickname(&nickname)).await {
            Ok(Reply::Complete(_)) => {
                tracing::info!("Nickname changed from '{}' to '{}'", current, nickname);
                session.context.refresh_roster_pending = true;
                session.context.last_pushed = Some(key);
                Ok(())
            }
            Ok(Reply::Pending) => {
                // confirmed or rejected by the late reply on the next run
                tracing::info!("Nickname update to '{}' sent, not confirmed yet", nickname);
                Ok(())
            }
            Err(QueryError::Command { id, message }) => {
                tracing::warn!(
                    "Nickname update to '{}' rejected (id={}): {}",
                    nickname,
                    id,
                    message
                );
                session.context.last_pushed = Some(key);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn own_client_id(
        &self,
        session: &mut QuerySession,
        key: &IdentityKey,
    ) -> Result<Option<String>, QueryError> {
        let rows = match lookup(session, &Command::whoami(), key).await? {
            Some(rows) => rows,
            None => return Ok(None),
        };
        rows.iter()
            .find_map(|row| row.get("clid"))
            .map(|clid| Some(clid.to_string()))
            .ok_or_else(|| QueryError::Malformed("whoami reply without clid".to_string()))
    }

    async fn current_nickname(
        &self,
        session: &mut QuerySession,
        own_id: &str,
        key: &IdentityKey,
    ) -> Result<Option<String>, QueryError> {
        let command = Command::client_variable(own_id, &[NICKNAME_VARIABLE]);
        let rows = match lookup(session, &command, key).await? {
            Some(rows) => rows,
            None => return Ok(None),
        };
        rows.iter()
            .find_map(|row| row.get(NICKNAME_VARIABLE))
            .map(|nickname| Some(nickname.to_string()))
            .ok_or_else(|| QueryError::Malformed("clientvariable reply without nickname".to_string()))
    }
}

/// Run a lookup; `None` when it is pending or failed.
///
/// A failed lookup gives up on this identity until it changes again, so a
/// permanently failing command is not retried on every iteration.
async fn lookup(
    session: &mut QuerySession,
    command: &Command,
    key: &IdentityKey,
) -> Result<Option<Vec<Record>>, QueryError> {
    match session.execute(command).await {
        Ok(Reply::Complete(rows)) => Ok(Some(rows)),
        Ok(Reply::Pending) => Ok(None),
        Err(QueryError::Command { id, message }) => {
            tracing::warn!(
                "Identity lookup '{}' failed (id={}): {}",
                command.name(),
                id,
                message
            );
            session.context.last_pushed = Some(key.clone());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
