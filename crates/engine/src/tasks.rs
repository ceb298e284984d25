use crate::error::{Result, SyncError};
use crate::{drift, genres, SyncEngine, TickReport};
use sparty_core::time::unix_secs;
use sparty_core::{Party, PartyData, User, UserId};
use sparty_store::{PartyFilter, PartyUpdate, StoreError, UserFilter, UserPatch};
use std::time::SystemTime;
use tracing::{debug, info, warn};

fn access_token(user: &User) -> Result<String> {
    user.session
        .as_ref()
        .map(|s| s.access_token.clone())
        .ok_or_else(|| SyncError::MissingSession(user.id.clone()))
}

enum Reaped {
    Kept,
    Evicted,
    Deleted,
}

#[derive(Default)]
struct Steered {
    removed: usize,
    corrected: usize,
}

impl SyncEngine {
    /// Adds every stored party the registry does not know yet. Never removes.
    pub async fn discover_parties(&self) -> TickReport {
        let mut report = TickReport::default();
        let parties = match self.parties.list(&PartyFilter::all()).await {
            Ok(parties) => parties,
            Err(err) => {
                warn!(error = %err, "party discovery could not list parties");
                report.failed += 1;
                return report;
            }
        };

        for party in parties {
            report.visited += 1;
            if self.registry.insert_if_absent(&party.id, party.info.members) {
                debug!(party = %party.id, "party discovered");
                report.changed += 1;
            }
        }
        report
    }

    /// Deletes parties whose owner has been idle past the inactivity timeout,
    /// and evicts registry entries whose record is gone or unreadable.
    pub async fn reap_inactive(&self, now: SystemTime) -> TickReport {
        let mut report = TickReport::default();
        let now = unix_secs(now);
        for id in self.registry.party_ids() {
            report.visited += 1;
            match self.reap_party(&id, now).await {
                Ok(Reaped::Kept) => {}
                Ok(Reaped::Evicted) | Ok(Reaped::Deleted) => report.changed += 1,
                Err(err) => {
                    warn!(party = %id, error = %err, "inactivity check failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn reap_party(&self, id: &str, now: i64) -> Result<Reaped> {
        let party = match self.parties.get(id).await {
            Ok(party) => party,
            Err(StoreError::NotFound { .. }) => {
                self.registry.evict(id);
                info!(party = %id, "party no longer stored; evicted");
                return Ok(Reaped::Evicted);
            }
            Err(StoreError::Validation(reason)) => {
                self.registry.evict(id);
                warn!(party = %id, reason = %reason, "party record unreadable; evicted");
                return Ok(Reaped::Evicted);
            }
            Err(err) => return Err(err.into()),
        };

        let Some(data) = &party.data else {
            return Ok(Reaped::Kept);
        };

        let timeout = self.cfg.inactivity_timeout.as_secs() as i64;
        if data.is_playing || data.idle_secs(now) < timeout {
            return Ok(Reaped::Kept);
        }

        self.parties.delete(id).await?;
        self.registry.evict(id);
        info!(
            party = %id,
            idle_secs = data.idle_secs(now),
            "party deleted due to inactivity"
        );
        self.release_participants(&party).await;
        Ok(Reaped::Deleted)
    }

    /// Clears the current-party pointer of everyone who was in a deleted party.
    async fn release_participants(&self, party: &Party) {
        let participants = std::iter::once(&party.info.owner).chain(party.info.members.iter());
        for user_id in participants {
            if let Err(err) = self.clear_current_party(user_id, &party.id).await {
                debug!(user = %user_id, error = %err, "could not clear current party");
            }
        }
    }

    async fn clear_current_party(&self, user_id: &str, party_id: &str) -> Result<()> {
        let user = self.users.get_by_id(user_id).await?;
        if user.current_party.as_deref() == Some(party_id) {
            self.users
                .update_user(user_id, UserPatch::current_party(None))
                .await?;
        }
        Ok(())
    }

    /// Rewrites each party's `data` snapshot from its owner's live playback.
    pub async fn refresh_details(&self, now: SystemTime) -> TickReport {
        let mut report = TickReport::default();
        let now = unix_secs(now);
        for id in self.registry.party_ids() {
            report.visited += 1;
            match self.refresh_party(&id, now).await {
                Ok(true) => report.changed += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(party = %id, error = %err, "party details refresh skipped");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn refresh_party(&self, id: &str, now: i64) -> Result<bool> {
        let party = match self.parties.get(id).await {
            Ok(party) => party,
            Err(err) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let owner = self.users.get_by_id(&party.info.owner).await?;
        let token = access_token(&owner)?;

        let Some(current) = self.api.currently_playing(&token).await? else {
            debug!(party = %id, owner = %owner.id, "owner has no active playback");
            return Ok(false);
        };
        let queue = self.api.queue(&token, self.cfg.queue_limit).await?;
        let history = self
            .api
            .recently_played(&token, self.cfg.history_limit)
            .await?;

        let data = PartyData {
            is_playing: current.is_playing,
            current_track: current.track,
            progress_ms: current.progress_ms,
            last_played_change: now,
            queue: queue.into_iter().take(self.cfg.queue_limit).collect(),
            history,
        };
        match self.parties.update(id, PartyUpdate::SetData(data)).await {
            Err(err) if err.is_not_found() => return Ok(false),
            other => other?,
        }
        Ok(true)
    }

    /// Removes members who stopped listening and re-seeks drifting members to
    /// the owner's recorded track and offset.
    pub async fn steer_playback(&self) -> TickReport {
        let mut report = TickReport::default();
        for id in self.registry.party_ids() {
            report.visited += 1;
            match self.steer_party(&id).await {
                Ok(steered) => report.changed += steered.removed + steered.corrected,
                Err(err) => {
                    warn!(party = %id, error = %err, "playback steering skipped");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn steer_party(&self, id: &str) -> Result<Steered> {
        let mut steered = Steered::default();
        let party = match self.parties.get(id).await {
            Ok(party) => party,
            Err(err) if err.is_not_found() => return Ok(steered),
            Err(err) => return Err(err.into()),
        };
        let Some(data) = &party.data else {
            return Ok(steered);
        };
        self.registry.set_members(id, party.info.members.clone());

        let owner_playing = match self.owner_is_playing(&party.info.owner).await {
            Ok(playing) => playing,
            Err(err) => {
                debug!(party = %id, error = %err, "owner unreachable; treating as not playing");
                false
            }
        };

        for member in party.info.members.iter() {
            if member == &party.info.owner {
                continue;
            }
            match self.steer_member(&party, data, member, owner_playing).await {
                Ok(MemberAction::Removed) => steered.removed += 1,
                Ok(MemberAction::Corrected) => steered.corrected += 1,
                Ok(MemberAction::None) => {}
                Err(err) => {
                    warn!(party = %id, member = %member, error = %err, "member skipped this tick");
                }
            }
        }
        Ok(steered)
    }

    async fn owner_is_playing(&self, owner_id: &str) -> Result<bool> {
        let owner = self.users.get_by_id(owner_id).await?;
        let token = access_token(&owner)?;
        Ok(self
            .api
            .currently_playing(&token)
            .await?
            .map(|now| now.is_playing)
            .unwrap_or(false))
    }

    async fn steer_member(
        &self,
        party: &Party,
        data: &PartyData,
        member_id: &UserId,
        owner_playing: bool,
    ) -> Result<MemberAction> {
        let member = self.users.get_by_id(member_id).await?;
        let token = access_token(&member)?;
        let listening = self
            .api
            .currently_playing(&token)
            .await?
            .filter(|now| now.is_playing);

        let Some(listening) = listening else {
            self.parties
                .update(&party.id, PartyUpdate::Pull(member_id.clone()))
                .await?;
            self.registry.remove_member(&party.id, member_id);
            if member.current_party.as_deref() == Some(party.id.as_str()) {
                self.users
                    .update_user(member_id, UserPatch::current_party(None))
                    .await?;
            }
            info!(party = %party.id, member = %member_id, "member stopped listening; removed");
            return Ok(MemberAction::Removed);
        };

        if !owner_playing {
            return Ok(MemberAction::None);
        }

        let owner_uri = data.current_track.uri.as_str();
        if !drift::needs_correction(
            owner_uri,
            data.progress_ms,
            &listening,
            self.cfg.drift_tolerance_ms,
        ) {
            return Ok(MemberAction::None);
        }

        let status = self.api.play_at(&token, owner_uri, data.progress_ms).await?;
        if (200..300).contains(&status) {
            debug!(
                party = %party.id,
                member = %member_id,
                track = %owner_uri,
                position_ms = data.progress_ms,
                "member re-synced"
            );
        } else {
            warn!(party = %party.id, member = %member_id, status, "re-sync not accepted; retrying next tick");
        }
        Ok(MemberAction::Corrected)
    }

    /// Stores the top genres of the artists in each party's cached history.
    pub async fn aggregate_party_genres(&self) -> TickReport {
        let mut report = TickReport::default();
        for id in self.registry.party_ids() {
            report.visited += 1;
            match self.party_genres(&id).await {
                Ok(true) => report.changed += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(party = %id, error = %err, "genre aggregation skipped");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn party_genres(&self, id: &str) -> Result<bool> {
        let party = match self.parties.get(id).await {
            Ok(party) => party,
            Err(err) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let Some(data) = &party.data else {
            return Ok(false);
        };
        let artist_ids = genres::history_artist_ids(&data.history);
        if artist_ids.is_empty() {
            return Ok(false);
        }

        let owner = self.users.get_by_id(&party.info.owner).await?;
        let token = access_token(&owner)?;
        let artists = self.api.artists(&token, &artist_ids).await?;
        let top = genres::top_genres(&artists, self.cfg.top_genre_limit);
        self.parties.update(id, PartyUpdate::genres(top)).await?;
        Ok(true)
    }

    /// Stores each signed-in user's top genres, derived from their top artists.
    pub async fn aggregate_user_genres(&self) -> TickReport {
        let mut report = TickReport::default();
        let users = match self.users.list_users(&UserFilter::with_session()).await {
            Ok(users) => users,
            Err(err) => {
                warn!(error = %err, "user genre aggregation could not list users");
                report.failed += 1;
                return report;
            }
        };

        for user in users {
            report.visited += 1;
            match self.user_genres(&user).await {
                Ok(()) => report.changed += 1,
                Err(err) => {
                    warn!(user = %user.id, error = %err, "user genre aggregation skipped");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn user_genres(&self, user: &User) -> Result<()> {
        let token = access_token(user)?;
        let artists = self.api.top_artists(&token).await?;
        let top = genres::top_genres(&artists, self.cfg.top_genre_limit);
        self.users
            .update_user(&user.id, UserPatch::top_genres(top))
            .await?;
        Ok(())
    }
}

enum MemberAction {
    None,
    Removed,
    Corrected,
}

#[cfg(test)]
mod tests {
    use crate::testing::{artist_ref, at, details, fixture, paused, playing, track, Fixture};
    use crate::TaskKind;
    use sparty_core::{PartyData, Track};
    use sparty_store::{PartyStore, PartyUpdate, StoreError, UserStore};

    async fn warm(fx: &Fixture, party: &str, data: PartyData) {
        fx.store
            .update(party, PartyUpdate::SetData(data))
            .await
            .unwrap();
    }

    fn data(is_playing: bool, last_played_change: i64) -> PartyData {
        PartyData {
            is_playing,
            current_track: track("T"),
            progress_ms: 10_000,
            last_played_change,
            queue: Vec::new(),
            history: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // discovery
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn discovery_is_idempotent() {
        let fx = fixture().await;
        let p1 = fx.party("owner", &["m1", "m2"]).await;
        let p2 = fx.party("m3", &[]).await;

        let first = fx.engine.run_task(TaskKind::Discovery, at(0)).await;
        let second = fx.engine.run_task(TaskKind::Discovery, at(5)).await;

        assert_eq!(first.changed, 2);
        assert_eq!(second.changed, 0);
        assert_eq!(fx.engine.registry().len(), 2);
        assert_eq!(fx.engine.registry().members(&p1).unwrap().len(), 2);
        assert!(fx.engine.registry().members(&p2).unwrap().is_empty());
    }

    // -------------------------------------------------------------------------
    // reaper
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn reaper_deletes_party_paused_for_timeout() {
        let fx = fixture().await;
        let stale = fx.party("owner", &["m1"]).await;
        let fresh = fx.party("m2", &[]).await;
        let playing = fx.party("m3", &[]).await;
        warm(&fx, &stale, data(false, 1_000)).await;
        warm(&fx, &fresh, data(false, 1_001)).await;
        warm(&fx, &playing, data(true, 0)).await;
        fx.engine.run_task(TaskKind::Discovery, at(1_000)).await;

        let report = fx.engine.run_task(TaskKind::Reaper, at(1_150)).await;

        assert_eq!(report.changed, 1);
        assert!(matches!(
            fx.store.get(&stale).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(!fx.engine.registry().contains(&stale));
        assert!(fx.store.get(&fresh).await.is_ok());
        assert!(fx.store.get(&playing).await.is_ok());
        assert!(fx.engine.registry().contains(&playing));
        assert_eq!(fx.store.get_by_id("owner").await.unwrap().current_party, None);
    }

    #[tokio::test]
    async fn reaper_skips_cold_parties_and_evicts_gone_or_corrupt_ones() {
        let fx = fixture().await;
        let cold = fx.party("owner", &[]).await;
        let gone = fx.party("m1", &[]).await;
        let corrupt = fx.party("m2", &[]).await;
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        fx.store.delete(&gone).await.unwrap();
        fx.store
            .put_raw_party(&corrupt, serde_json::json!({"info": "garbage"}))
            .await
            .unwrap();

        let report = fx.engine.run_task(TaskKind::Reaper, at(10_000)).await;

        assert_eq!(report.changed, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(fx.engine.registry().party_ids(), vec![cold.clone()]);
        assert!(fx.store.get(&cold).await.is_ok());
    }

    // -------------------------------------------------------------------------
    // details
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn details_snapshot_owner_playback() {
        let fx = fixture().await;
        let id = fx.party("owner", &["m1"]).await;
        fx.api.set_playing("tok-owner", playing("T", 10_000));
        fx.api
            .set_queue("tok-owner", (0..8).map(|i| track(&format!("q{i}"))).collect());
        fx.api.set_history("tok-owner", vec![track("h1"), track("h2")]);
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        let report = fx.engine.run_task(TaskKind::Details, at(500)).await;

        assert_eq!(report.changed, 1);
        let data = fx.store.get(&id).await.unwrap().data.unwrap();
        assert!(data.is_playing);
        assert_eq!(data.current_track.uri, "T");
        assert_eq!(data.progress_ms, 10_000);
        assert_eq!(data.last_played_change, 500);
        assert_eq!(data.queue.len(), 5);
        assert_eq!(data.history.len(), 2);
    }

    #[tokio::test]
    async fn every_refresh_stamps_the_change_time() {
        let fx = fixture().await;
        let id = fx.party("owner", &[]).await;
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        fx.api.set_playing("tok-owner", paused("T", 3_000));
        fx.engine.run_task(TaskKind::Details, at(100)).await;
        fx.engine.run_task(TaskKind::Details, at(200)).await;
        assert_eq!(fx.store.get(&id).await.unwrap().data.unwrap().last_played_change, 200);

        fx.engine.run_task(TaskKind::Reaper, at(250)).await;
        assert!(fx.store.get(&id).await.is_ok());
    }

    #[tokio::test]
    async fn owner_gone_silent_is_reaped_after_timeout() {
        let fx = fixture().await;
        let id = fx.party("owner", &[]).await;
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        fx.api.set_playing("tok-owner", paused("T", 3_000));
        fx.engine.run_task(TaskKind::Details, at(100)).await;
        fx.api.clear_playing("tok-owner");
        fx.engine.run_task(TaskKind::Details, at(200)).await;

        fx.engine.run_task(TaskKind::Reaper, at(249)).await;
        assert!(fx.store.get(&id).await.is_ok());
        fx.engine.run_task(TaskKind::Reaper, at(250)).await;
        assert!(matches!(
            fx.store.get(&id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_owner_is_skipped_without_eviction() {
        let fx = fixture().await;
        let broken = fx.party("owner", &[]).await;
        let healthy = fx.party("m1", &[]).await;
        fx.api.fail_auth("tok-owner");
        fx.api.set_playing("tok-m1", playing("T", 1_000));
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        let report = fx.engine.run_task(TaskKind::Details, at(10)).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.changed, 1);
        assert!(fx.engine.registry().contains(&broken));
        assert!(fx.store.get(&broken).await.unwrap().data.is_none());
        assert!(fx.store.get(&healthy).await.unwrap().data.is_some());
    }

    #[tokio::test]
    async fn owner_without_playback_leaves_party_cold() {
        let fx = fixture().await;
        let id = fx.party("owner", &[]).await;
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        let report = fx.engine.run_task(TaskKind::Details, at(10)).await;

        assert_eq!(report, crate::TickReport { visited: 1, changed: 0, failed: 0 });
        assert!(fx.store.get(&id).await.unwrap().data.is_none());
    }

    #[tokio::test]
    async fn concurrent_readers_never_see_mixed_snapshots() {
        let fx = fixture().await;
        let id = fx.party("owner", &[]).await;
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        let reader = {
            let store = fx.store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    if let Some(data) = store.get(&id).await.unwrap().data {
                        let tag = data.current_track.uri.clone();
                        assert!(data.queue.iter().all(|t| t.uri.starts_with(&tag)));
                        assert!(data.history.iter().all(|t| t.uri.starts_with(&tag)));
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for round in 0..20 {
            let tag = if round % 2 == 0 { "A" } else { "B" };
            fx.api.set_playing("tok-owner", playing(tag, round * 1_000));
            fx.api.set_queue(
                "tok-owner",
                vec![track(&format!("{tag}-q1")), track(&format!("{tag}-q2"))],
            );
            fx.api.set_history("tok-owner", vec![track(&format!("{tag}-h1"))]);
            fx.engine.run_task(TaskKind::Details, at(round)).await;
            tokio::task::yield_now().await;
        }
        reader.await.unwrap();
    }

    // -------------------------------------------------------------------------
    // steering
    // -------------------------------------------------------------------------

    async fn steering_fixture(member_state: Option<sparty_core::NowPlaying>) -> (Fixture, String) {
        let fx = fixture().await;
        let id = fx.party("owner", &["m1"]).await;
        warm(&fx, &id, data(true, 0)).await;
        fx.api.set_playing("tok-owner", playing("T", 10_000));
        if let Some(state) = member_state {
            fx.api.set_playing("tok-m1", state);
        }
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;
        (fx, id)
    }

    #[tokio::test]
    async fn member_within_window_is_left_alone() {
        let (fx, _) = steering_fixture(Some(playing("T", 10_500))).await;
        let report = fx.engine.run_task(TaskKind::Steering, at(1)).await;
        assert_eq!(report.changed, 0);
        assert!(fx.api.plays().is_empty());
    }

    #[tokio::test]
    async fn member_on_other_track_is_seeked_to_owner() {
        let (fx, _) = steering_fixture(Some(playing("U", 10_000))).await;
        let report = fx.engine.run_task(TaskKind::Steering, at(1)).await;
        assert_eq!(report.changed, 1);
        assert_eq!(
            fx.api.plays(),
            vec![("tok-m1".to_string(), "T".to_string(), 10_000)]
        );
    }

    #[tokio::test]
    async fn member_just_outside_window_is_seeked() {
        let (fx, _) = steering_fixture(Some(playing("T", 11_001))).await;
        fx.engine.run_task(TaskKind::Steering, at(1)).await;
        assert_eq!(fx.api.plays().len(), 1);
    }

    #[tokio::test]
    async fn rejected_seek_is_retried_next_tick() {
        let (fx, id) = steering_fixture(Some(playing("U", 0))).await;
        fx.api.set_play_status(429);

        let first = fx.engine.run_task(TaskKind::Steering, at(1)).await;
        let second = fx.engine.run_task(TaskKind::Steering, at(6)).await;

        assert_eq!(first.failed, 0);
        assert_eq!(second.failed, 0);
        assert_eq!(fx.api.plays().len(), 2);
        let members = fx.store.get(&id).await.unwrap().info.members;
        assert!(members.contains("m1"));
        assert!(fx.engine.registry().members(&id).unwrap().contains("m1"));
    }

    #[tokio::test]
    async fn stopped_member_is_removed() {
        let fx = fixture().await;
        let id = fx.party("owner", &["m1", "m2"]).await;
        fx.join_current("m1", &id).await;
        warm(&fx, &id, data(true, 0)).await;
        fx.api.set_playing("tok-owner", playing("T", 10_000));
        fx.api.set_playing("tok-m1", paused("T", 10_000));
        fx.api.set_playing("tok-m2", playing("T", 10_000));
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        let report = fx.engine.run_task(TaskKind::Steering, at(1)).await;

        assert_eq!(report.changed, 1);
        let members = fx.store.get(&id).await.unwrap().info.members;
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec!["m2".to_string()]);
        assert_eq!(
            fx.engine.registry().members(&id).unwrap().into_iter().collect::<Vec<_>>(),
            vec!["m2".to_string()]
        );
        assert_eq!(fx.store.get_by_id("m1").await.unwrap().current_party, None);
        assert!(fx.api.plays().is_empty());
    }

    #[tokio::test]
    async fn paused_owner_prevents_correction_but_not_removal() {
        let fx = fixture().await;
        let id = fx.party("owner", &["m1", "m2"]).await;
        warm(&fx, &id, data(false, 0)).await;
        fx.api.set_playing("tok-owner", paused("T", 10_000));
        fx.api.set_playing("tok-m1", playing("U", 0));
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        fx.engine.run_task(TaskKind::Steering, at(1)).await;

        assert!(fx.api.plays().is_empty());
        let members = fx.store.get(&id).await.unwrap().info.members;
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn cold_party_is_not_steered() {
        let fx = fixture().await;
        let id = fx.party("owner", &["m1"]).await;
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        fx.engine.run_task(TaskKind::Steering, at(1)).await;

        assert_eq!(fx.store.get(&id).await.unwrap().info.members.len(), 1);
    }

    #[tokio::test]
    async fn unreachable_member_is_skipped_not_removed() {
        let (fx, id) = steering_fixture(None).await;
        fx.api.fail_auth("tok-m1");

        let report = fx.engine.run_task(TaskKind::Steering, at(1)).await;

        assert_eq!(report.failed, 0);
        assert_eq!(fx.store.get(&id).await.unwrap().info.members.len(), 1);
    }

    // -------------------------------------------------------------------------
    // genres
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn party_genres_come_from_history_artists() {
        let fx = fixture().await;
        let id = fx.party("owner", &[]).await;
        let mut d = data(true, 0);
        d.history = vec![
            Track {
                uri: "h1".to_string(),
                artists: vec![artist_ref("a")],
                ..Track::default()
            },
            Track {
                uri: "h2".to_string(),
                artists: vec![artist_ref("a"), artist_ref("b")],
                ..Track::default()
            },
        ];
        warm(&fx, &id, d).await;
        fx.api.set_artist("a", &["rock", "pop"]);
        fx.api.set_artist("b", &["pop"]);
        fx.engine.run_task(TaskKind::Discovery, at(0)).await;

        let report = fx.engine.run_task(TaskKind::PartyGenres, at(1)).await;

        assert_eq!(report.changed, 1);
        assert_eq!(
            fx.store.get(&id).await.unwrap().info.genres,
            vec!["pop".to_string(), "rock".to_string()]
        );
    }

    #[tokio::test]
    async fn user_genres_come_from_top_artists() {
        let fx = fixture().await;
        fx.api.set_top_artists(
            "tok-m1",
            vec![details("x", &["house", "techno"]), details("y", &["techno"])],
        );

        let report = fx.engine.run_task(TaskKind::UserGenres, at(0)).await;

        assert_eq!(report.visited, 4);
        let user = fx.store.get_by_id("m1").await.unwrap();
        assert_eq!(user.top_genres, vec!["techno".to_string(), "house".to_string()]);
    }
}
