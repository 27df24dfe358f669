//! InMemory Roster Repository 実装
//!
//! ドメイン層が定義する RosterRepository trait の具体的な実装。
//! ロスター全体を 1 つの Mutex で保護するため、呼び出し側は常に
//! 一貫したスナップショットを観測します（更新途中の ParticipantRecord は見えない）。
//!
//! ロックは同期的な `std::sync::Mutex` です。保持時間は参加者数に比例する
//! 程度で、ネットワーク I/O をまたいで保持されることはありません。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{ParticipantRecord, ParticipantRow, Roster, RosterRepository, Talker};

/// インメモリ Roster Repository 実装
#[derive(Clone, Default)]
pub struct InMemoryRosterRepository {
    roster: Arc<Mutex<Roster>>,
}

impl InMemoryRosterRepository {
    fn lock(&self) -> MutexGuard<'_, Roster> {
        // a panic while holding the lock cannot leave a record half-written:
        // every mutation is a plain field assignment on an existing entry
        self.roster.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RosterRepository for InMemoryRosterRepository {
    fn refresh(&self, rows: Vec<ParticipantRow>, now: i64) {
        let mut roster = self.lock();
        roster.refresh(rows, now);
        tracing::debug!("Roster refreshed: {} participants", roster.len());
    }

    fn apply_talk(&self, id: &str, talking: bool, whispering: bool, now: i64) -> bool {
        self.lock().apply_talk(id, talking, whispering, now)
    }

    fn apply_move(&self, id: &str, channel_id: &str) -> bool {
        self.lock().apply_move(id, channel_id)
    }

    fn mark_silent(&self, id: &str) -> bool {
        self.lock().mark_silent(id)
    }

    fn select_talker(&self, now: i64, talk_timeout_millis: i64) -> Talker {
        self.lock().select_talker(now, talk_timeout_millis)
    }

    fn snapshot(&self) -> Vec<ParticipantRecord> {
        let mut participants: Vec<ParticipantRecord> =
            self.lock().participants().cloned().collect();

        // Sort by id for consistent ordering
        participants.sort_by(|a, b| a.id.cmp(&b.id));

        participants
    }

    fn count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_TALK_TIMEOUT_MILLIS;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemoryRosterRepository の更新操作と読み取り操作
    // - 別スレッドからの読み取りが書き込みと共存できること
    //
    // 【なぜこのテストが必要か】
    // - 接続スレッドと呼び出し側スレッドの唯一の共有状態である
    // - 発話者の判定は一貫したスナップショットに依存する
    // ========================================

    const NOW: i64 = 1_700_000_000_000;

    fn row(id: &str, nickname: &str) -> ParticipantRow {
        ParticipantRow {
            id: id.to_string(),
            nickname: nickname.to_string(),
            channel_id: None,
        }
    }

    #[test]
    fn test_snapshot_is_sorted_copy() {
        // テスト項目: スナップショットは ID 順のコピーで、その後の更新に影響されない
        // given (前提条件):
        let repo = InMemoryRosterRepository::default();
        repo.refresh(vec![row("2", "Ben"), row("1", "Ann")], NOW);

        // when (操作):
        let snapshot = repo.snapshot();
        repo.apply_talk("1", true, false, NOW);

        // then (期待する結果):
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, "1");
        assert_eq!(snapshot[1].id, "2");
        assert!(!snapshot[0].is_talking);
        assert_eq!(repo.count(), 2);
    }

    #[test]
    fn test_talker_visible_from_other_thread() {
        // テスト項目: 別スレッドで適用した発話状態が呼び出し側から見える
        // given (前提条件):
        let repo = InMemoryRosterRepository::default();
        repo.refresh(vec![row("7", "Nana")], NOW);
        let writer = repo.clone();

        // when (操作):
        std::thread::spawn(move || {
            writer.apply_talk("7", true, false, NOW);
        })
        .join()
        .expect("writer thread panicked");

        // then (期待する結果):
        let talker = repo.select_talker(NOW, DEFAULT_TALK_TIMEOUT_MILLIS);
        assert_eq!(talker.nickname, "Nana");
        assert!(!talker.whispering);
    }

    #[test]
    fn test_updates_for_unknown_ids_are_ignored() {
        // テスト項目: 未知の ID への更新は false を返し、ロスターは変わらない
        // given (前提条件):
        let repo = InMemoryRosterRepository::default();

        // when (操作):
        let talk = repo.apply_talk("9", true, true, NOW);
        let moved = repo.apply_move("9", "3");
        let silenced = repo.mark_silent("9");

        // then (期待する結果):
        assert!(!talk && !moved && !silenced);
        assert_eq!(repo.count(), 0);
    }
}
