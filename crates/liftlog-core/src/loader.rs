//! Screen data loaders.
//!
//! Each loader reads through the [`QueryCache`]: a warm key is served
//! without touching the network, a cold one is fetched and stored. After a
//! write, the call site invalidates the keys listed by the `after_*`
//! helpers and loads again.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ApiClient;
use crate::cache::{CacheKey, Invalidate, QueryCache};
use crate::models::{Exercise, Workout, WorkoutExercise};
use crate::workout_view::WorkoutView;

/// Everything the home and log screens show.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HomeData {
    /// Newest first
    pub workouts: Vec<Workout>,
    pub exercises: Vec<Exercise>,
    /// Oldest first, with exercise and workout expanded
    pub workout_exercises: Vec<WorkoutExercise>,
}

/// Cached payload of the workout detail key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutDetail {
    pub workout: Workout,
    pub workout_exercises: Vec<WorkoutExercise>,
}

/// Everything the workout screen shows.
#[derive(Debug, Clone)]
pub struct WorkoutData {
    pub workout: Workout,
    pub workout_exercises: Vec<WorkoutExercise>,
    pub exercises: Vec<Exercise>,
}

impl WorkoutData {
    pub fn into_view(self) -> WorkoutView {
        WorkoutView::new(self.workout, self.workout_exercises, self.exercises)
    }

    /// Merge into an existing view, keeping its unsaved edits. `ticket` is
    /// what [`WorkoutView::begin_reload`] gave the load when it started.
    pub fn reconcile_into(self, view: &mut WorkoutView, ticket: u64) -> bool {
        view.reconcile(ticket, self.workout, self.workout_exercises, self.exercises)
    }
}

async fn load_exercises(cache: &QueryCache, api: &ApiClient) -> Result<Vec<Exercise>> {
    cache
        .fetch_or_populate(&CacheKey::exercises(), || api.fetch_exercises())
        .await
}

/// Workouts, catalog and logged exercises of `user_id`, fetched in parallel
pub async fn load_home(cache: &QueryCache, api: &ApiClient, user_id: &str) -> Result<HomeData> {
    let workouts_key = CacheKey::workouts(user_id);
    let logged_key = CacheKey::user_workout_exercises(user_id);

    let workouts = cache.fetch_or_populate(&workouts_key, || api.fetch_workouts(user_id));
    let exercises = load_exercises(cache, api);
    let workout_exercises =
        cache.fetch_or_populate(&logged_key, || api.fetch_user_workout_exercises(user_id));

    let (workouts, exercises, workout_exercises) =
        futures::try_join!(workouts, exercises, workout_exercises)?;

    debug!(
        workouts = workouts.len(),
        exercises = exercises.len(),
        logged = workout_exercises.len(),
        "Home data loaded"
    );
    Ok(HomeData {
        workouts,
        exercises,
        workout_exercises,
    })
}

/// One workout with its exercises, plus the catalog for the picker
pub async fn load_workout(cache: &QueryCache, api: &ApiClient, workout_id: &str) -> Result<WorkoutData> {
    let detail_key = CacheKey::workout_detail(workout_id);
    let detail = cache.fetch_or_populate(&detail_key, || async {
        let (workout, workout_exercises) = futures::try_join!(
            api.fetch_workout(workout_id),
            api.fetch_workout_exercises(workout_id)
        )?;
        Ok(WorkoutDetail {
            workout,
            workout_exercises,
        })
    });
    let exercises = load_exercises(cache, api);

    let (detail, exercises) = futures::try_join!(detail, exercises)?;
    Ok(WorkoutData {
        workout: detail.workout,
        workout_exercises: detail.workout_exercises,
        exercises,
    })
}

/// The user's pending workout, if any
pub async fn find_active_workout(
    cache: &QueryCache,
    api: &ApiClient,
    user_id: &str,
) -> Result<Option<Workout>> {
    cache
        .fetch_or_populate(&CacheKey::active_workout(user_id), || api.fetch_active_workout(user_id))
        .await
}

/// Drop what a set change made stale, then load the workout again
pub async fn revalidate_workout(
    cache: &QueryCache,
    api: &ApiClient,
    workout_id: &str,
    user_id: &str,
) -> Result<WorkoutData> {
    cache.invalidate(after_sets_changed(workout_id, user_id));
    load_workout(cache, api, workout_id).await
}

// ===== Invalidation after writes =====

/// A workout was created
pub fn after_workout_created(user_id: &str) -> Invalidate {
    Invalidate::Keys(vec![CacheKey::workouts(user_id), CacheKey::active_workout(user_id)])
}

/// An exercise was added to a workout or its sets were saved
pub fn after_sets_changed(workout_id: &str, user_id: &str) -> Invalidate {
    Invalidate::Keys(vec![
        CacheKey::workout_detail(workout_id),
        CacheKey::user_workout_exercises(user_id),
    ])
}

/// A workout was marked completed
pub fn after_workout_completed(workout_id: &str, user_id: &str) -> Invalidate {
    Invalidate::Keys(vec![
        CacheKey::workouts(user_id),
        CacheKey::active_workout(user_id),
        CacheKey::workout_detail(workout_id),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExerciseSet;

    /// Nothing listens on the discard port; any fetch fails fast
    fn offline_api() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9").unwrap()
    }

    fn workout(id: &str) -> Workout {
        Workout {
            id: id.into(),
            user_id: "u1".into(),
            ..Default::default()
        }
    }

    fn row(id: &str) -> WorkoutExercise {
        WorkoutExercise {
            id: id.into(),
            workout_id: "w1".into(),
            sets: vec![ExerciseSet::new(10.0, 10)],
            ..Default::default()
        }
    }

    fn warm_detail(cache: &QueryCache) {
        cache.set(
            &CacheKey::workout_detail("w1"),
            &WorkoutDetail {
                workout: workout("w1"),
                workout_exercises: vec![row("r1")],
            },
        );
        cache.set(&CacheKey::exercises(), &Vec::<Exercise>::new());
    }

    #[tokio::test]
    async fn test_load_workout_served_from_cache() {
        let cache = QueryCache::in_memory();
        warm_detail(&cache);

        let data = load_workout(&cache, &offline_api(), "w1").await.unwrap();
        assert_eq!(data.workout.id, "w1");
        let view = data.into_view();
        assert_eq!(view.rows()[0].id(), "r1");
    }

    #[tokio::test]
    async fn test_load_home_served_from_cache() {
        let cache = QueryCache::in_memory();
        cache.set(&CacheKey::workouts("u1"), &vec![workout("w2"), workout("w1")]);
        cache.set(&CacheKey::exercises(), &Vec::<Exercise>::new());
        cache.set(&CacheKey::user_workout_exercises("u1"), &vec![row("r1")]);

        let home = load_home(&cache, &offline_api(), "u1").await.unwrap();
        assert_eq!(home.workouts.len(), 2);
        assert_eq!(home.workout_exercises.len(), 1);
    }

    #[tokio::test]
    async fn test_cached_absence_of_active_workout() {
        let cache = QueryCache::in_memory();
        cache.set(&CacheKey::active_workout("u1"), &Option::<Workout>::None);
        let active = find_active_workout(&cache, &offline_api(), "u1").await.unwrap();
        assert!(active.is_none());
    }

    #[tokio::test]
    async fn test_revalidate_goes_to_network() {
        let cache = QueryCache::in_memory();
        warm_detail(&cache);
        cache.set(&CacheKey::user_workout_exercises("u1"), &vec![row("r1")]);

        // The detail key is dropped, so the (unreachable) server is asked
        assert!(revalidate_workout(&cache, &offline_api(), "w1", "u1").await.is_err());
        assert!(!cache.contains(&CacheKey::workout_detail("w1")));
        assert!(!cache.contains(&CacheKey::user_workout_exercises("u1")));
        assert!(cache.contains(&CacheKey::exercises()));
    }

    #[test]
    fn test_invalidation_sets() {
        assert_eq!(
            after_workout_created("u1"),
            Invalidate::Keys(vec![CacheKey::workouts("u1"), CacheKey::active_workout("u1")])
        );
        match after_workout_completed("w1", "u1") {
            Invalidate::Keys(keys) => {
                assert_eq!(keys.len(), 3);
                assert!(keys.contains(&CacheKey::workout_detail("w1")));
            }
            other => panic!("unexpected scope {:?}", other),
        }
    }

    #[test]
    fn test_reconcile_into_keeps_local_edits() {
        let data = WorkoutData {
            workout: workout("w1"),
            workout_exercises: vec![row("r1")],
            exercises: Vec::new(),
        };
        let mut view = data.clone().into_view();
        view.editor_at(0).unwrap().add_set();

        let ticket = view.begin_reload();
        assert!(data.reconcile_into(&mut view, ticket));
        assert_eq!(view.rows()[0].editor.len(), 2);
    }
}
