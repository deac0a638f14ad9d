//! Image selection: choose which scenes get an illustration.
//!
//! Image generation is the expensive step, so at most `max_images` scenes are
//! illustrated. The choice is a uniform sample without replacement over the
//! eligible scenes (interior and exterior), made with a caller-supplied
//! random source so tests and reproducible runs can seed it.

use crate::output::Scene;
use rand::seq::index;
use rand::Rng;
use tracing::debug;

/// Positions of every scene allowed to receive an image.
pub fn eligible_positions(scenes: &[Scene]) -> Vec<usize> {
    scenes
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_eligible())
        .map(|(i, _)| i)
        .collect()
}

/// Draw `min(max_images, eligible)` scene positions uniformly at random.
///
/// Returns positions in ascending order. Selection is by position, so two
/// scenes with identical headings are still distinct candidates. No eligible
/// scene (or `max_images == 0`) yields an empty selection.
pub fn select_scenes<R: Rng + ?Sized>(scenes: &[Scene], max_images: usize, rng: &mut R) -> Vec<usize> {
    let eligible = eligible_positions(scenes);
    let amount = max_images.min(eligible.len());
    if amount == 0 {
        debug!("No scenes selected for imaging ({} eligible)", eligible.len());
        return Vec::new();
    }

    let mut selected: Vec<usize> = index::sample(rng, eligible.len(), amount)
        .into_iter()
        .map(|i| eligible[i])
        .collect();
    selected.sort_unstable();

    debug!(
        "Selected {} of {} eligible scenes for imaging: {:?}",
        selected.len(),
        eligible.len(),
        selected
    );
    selected
}
