//! UseCase: 参加者リストの全件リフレッシュ

use crate::{
    domain::{ParticipantRow, QueryError},
    infrastructure::codec::{Command, Record},
};

use super::session::{QuerySession, Reply};

/// 全件リフレッシュのユースケース
///
/// `clientlist` の結果でロスターを置き換えます。発話フラグは保持され、
/// リストに含まれない参加者は削除されます。
#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshRosterUseCase;

impl RefreshRosterUseCase {
    pub fn new() -> Self {
        Self
    }

    /// リフレッシュを実行
    ///
    /// 応答が時間内に揃わなければリフレッシュ要求を残し、次の周回で再試行します。
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 完了、保留、またはコマンド失敗（ログ済み）
    /// * `Err(QueryError)` - 接続を破棄すべきエラー
    pub async fn execute(&self, session: &mut QuerySession) -> Result<(), QueryError> {
        match session.execute(&Command::client_list()).await {
            Ok(Reply::Complete(records)) => {
                let rows: Vec<ParticipantRow> = records.iter().filter_map(row_from_record).collect();
                let now = session.now_millis();
                session.roster().refresh(rows, now);
                session.context.refresh_roster_pending = false;
                Ok(())
            }
            Ok(Reply::Pending) => Ok(()),
            Err(QueryError::Command { id, message }) => {
                tracing::warn!("Participant list failed (id={}): {}", id, message);
                session.context.refresh_roster_pending = false;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn row_from_record(record: &Record) -> Option<ParticipantRow> {
    let Some(id) = record.get("clid") else {
        tracing::debug!("Skipping participant row without clid: {:?}", record);
        return None;
    };
    Some(ParticipantRow {
        id: id.to_string(),
        nickname: record.get("client_nickname").unwrap_or_default().to_string(),
        channel_id: record.get("cid").map(str::to_string),
    })
}
