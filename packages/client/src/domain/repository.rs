//! Repository trait 定義
//!
//! 接続スレッド（書き込み）と呼び出し側スレッド（読み取り）が共有する
//! ロスターへのインターフェース。具体的な実装は Infrastructure 層が提供します。
//!
//! 呼び出し側をブロックしないため、メソッドは同期的でネットワーク I/O を伴いません。

use super::{ParticipantRecord, ParticipantRow, Talker};

/// Roster Repository trait
pub trait RosterRepository: Send + Sync {
    /// 全件リストでロスターを置き換える（発話フラグは保持）
    fn refresh(&self, rows: Vec<ParticipantRow>, now: i64);

    /// 発話状態を更新。未知の ID なら false
    fn apply_talk(&self, id: &str, talking: bool, whispering: bool, now: i64) -> bool;

    /// チャンネル移動を反映。未知の ID なら false
    fn apply_move(&self, id: &str, channel_id: &str) -> bool;

    /// 退出した参加者の発話フラグをクリア
    fn mark_silent(&self, id: &str) -> bool;

    /// 一貫したスナップショットから現在の発話者を選ぶ
    fn select_talker(&self, now: i64, talk_timeout_millis: i64) -> Talker;

    /// 参加者リストのコピーを取得
    fn snapshot(&self) -> Vec<ParticipantRecord>;

    /// 参加者数を取得
    fn count(&self) -> usize;
}
