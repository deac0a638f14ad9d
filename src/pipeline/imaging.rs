//! Imaging: fetch an illustration for each selected scene.
//!
//! Requests run concurrently, at most
//! [`ScreenplayConfig::effective_image_concurrency`] at a time, each bounded
//! by `image_timeout_secs`. Results land in slots indexed by scene position,
//! so completion order never matters.
//!
//! Every failure is soft: the scene keeps an empty slot, the error is logged
//! and returned for statistics, and the run carries on.

use crate::config::ScreenplayConfig;
use crate::error::ImageFetchError;
use crate::image_service::{validate_image_reference, ImageGenerator, ImageRequest};
use crate::output::{Scene, SceneImage};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Images gathered for one document.
#[derive(Debug, Default)]
pub struct ImagingOutcome {
    /// One slot per scene, `Some` where an image was fetched.
    pub images: Vec<Option<SceneImage>>,
    /// Every soft failure, in no particular order.
    pub failures: Vec<ImageFetchError>,
}

impl ImagingOutcome {
    pub fn fetched(&self) -> usize {
        self.images.iter().filter(|s| s.is_some()).count()
    }
}

/// Fetch and validate the image for a single scene.
///
/// The prompt is the scene heading without styling.
pub async fn fetch_scene_image(
    generator: &dyn ImageGenerator,
    scene: &Scene,
    config: &ScreenplayConfig,
) -> Result<SceneImage, ImageFetchError> {
    let request = ImageRequest {
        prompt: scene.heading_text().to_string(),
        size: config.image_size.clone(),
    };

    let secs = config.image_timeout_secs;
    let reference = timeout(
        Duration::from_secs(secs),
        generator.generate(scene.index, &request),
    )
    .await
    .map_err(|_| ImageFetchError::Timeout {
        scene: scene.index,
        secs,
    })??;

    let url = validate_image_reference(scene.index, &reference)?;
    Ok(SceneImage {
        url,
        prompt: request.prompt,
    })
}

/// Fetch images for the `selected` scene positions.
///
/// Positions outside `scenes` are ignored. The returned `images` vector
/// always has exactly `scenes.len()` slots.
pub async fn fetch_images(
    generator: &Arc<dyn ImageGenerator>,
    scenes: &[Scene],
    selected: &[usize],
    config: &ScreenplayConfig,
) -> ImagingOutcome {
    let mut outcome = ImagingOutcome {
        images: vec![None; scenes.len()],
        failures: Vec::new(),
    };

    let targets: Vec<&Scene> = selected.iter().filter_map(|&p| scenes.get(p)).collect();
    if targets.is_empty() {
        return outcome;
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_imaging_start(targets.len());
    }

    let results: Vec<(usize, Result<SceneImage, ImageFetchError>)> =
        stream::iter(targets.into_iter().map(|scene| {
            let generator = Arc::clone(generator);
            async move {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_start(scene.index);
                }
                let result = fetch_scene_image(generator.as_ref(), scene, config).await;
                if let Some(ref cb) = config.progress_callback {
                    match &result {
                        Ok(_) => cb.on_image_complete(scene.index),
                        Err(e) => cb.on_image_error(scene.index, &e.to_string()),
                    }
                }
                (scene.index, result)
            }
        }))
        .buffer_unordered(config.effective_image_concurrency())
        .collect()
        .await;

    for (position, result) in results {
        match result {
            Ok(image) => {
                debug!("Scene {}: image attached", position);
                if let Some(slot) = outcome.images.get_mut(position) {
                    *slot = Some(image);
                }
            }
            Err(e) => {
                warn!("Scene {} left without image: {}", position, e);
                outcome.failures.push(e);
            }
        }
    }

    outcome
}
