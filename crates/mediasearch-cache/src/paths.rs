//! Centralized derivative path layout (spec §6.2/§6.4).
//!
//! Every path stored in the database is relative to `data_dir`; no call
//! site outside this module should hand-format a derivative path.

use std::path::PathBuf;

use mediasearch_models::AssetId;

/// `{kind}/{library}/{asset_id % 1000}/…` sharding, per the proxy stage's
/// contract (spec §4.4).
fn shard(asset_id: AssetId) -> i64 {
    asset_id.as_i64() % 1000
}

/// `<library_slug>/thumbnails/<asset_id mod 1000>/<asset_id>.jpg`
pub fn thumbnail_path(library_slug: &str, asset_id: AssetId) -> PathBuf {
    PathBuf::from(library_slug)
        .join("thumbnails")
        .join(shard(asset_id).to_string())
        .join(format!("{}.jpg", asset_id.as_i64()))
}

/// `<library_slug>/proxies/<asset_id mod 1000>/<asset_id>.webp`
pub fn proxy_path(library_slug: &str, asset_id: AssetId) -> PathBuf {
    PathBuf::from(library_slug)
        .join("proxies")
        .join(shard(asset_id).to_string())
        .join(format!("{}.webp", asset_id.as_i64()))
}

/// `video_clips/<library_slug>/<asset_id>/head_clip.mp4` — the filename is
/// invariant, never parameterized.
pub fn video_head_clip_path(library_slug: &str, asset_id: AssetId) -> PathBuf {
    PathBuf::from("video_clips")
        .join(library_slug)
        .join(asset_id.as_i64().to_string())
        .join("head_clip.mp4")
}

/// `video_scenes/<library_slug>/<asset_id>/<start>_<end>.jpg`, with
/// `start`/`end` rounded to whole seconds for a stable filename.
pub fn video_scene_frame_path(library_slug: &str, asset_id: AssetId, start_ts: f64, end_ts: f64) -> PathBuf {
    PathBuf::from("video_scenes")
        .join(library_slug)
        .join(asset_id.as_i64().to_string())
        .join(format!("{}_{}.jpg", start_ts.round() as i64, end_ts.round() as i64))
}

/// Lazy on-demand search-hit clip, cut outside the core pipeline (out of
/// scope collaborator; only the naming invariant lives here).
pub fn lazy_clip_path(library_slug: &str, asset_id: AssetId, ts_seconds: f64) -> PathBuf {
    PathBuf::from("video_clips")
        .join(library_slug)
        .join(asset_id.as_i64().to_string())
        .join(format!("clip_{}.mp4", ts_seconds.trunc() as i64))
}

/// `tmp/<library_slug>/<uuid>.mp4` for an ephemeral transcode.
pub fn tmp_transcode_path(library_slug: &str, token: &str) -> PathBuf {
    PathBuf::from("tmp")
        .join(library_slug)
        .join(format!("{token}.mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sharding_is_stable_and_bounded() {
        let p = thumbnail_path("vacation", AssetId::new(2001));
        assert_eq!(
            p,
            PathBuf::from("vacation/thumbnails/1/2001.jpg")
        );
    }

    #[test]
    fn scene_frame_name_rounds_timestamps() {
        let p = video_scene_frame_path("vacation", AssetId::new(7), 9.6, 39.99);
        assert_eq!(p, PathBuf::from("video_scenes/vacation/7/10_40.jpg"));
    }
}
