// THEORY:
// Sprites are independent once the aggregator has produced them: no shared
// state, no ordering constraints between normalization and vectorization of
// different sprites. The parallel pipeline exploits exactly that and nothing
// more. Segmentation still runs sequentially (the label grid is one shared
// traversal), then each sprite is dispatched to a fixed pool of workers and
// the results are reassembled in the original size order, so the output is
// byte-identical to the sequential pipeline's.

use crate::core_modules::raster::Raster;
use crate::core_modules::sprite::Sprite;
use crate::core_modules::{aggregator, background, normalizer, region_labeler};
use crate::pipeline::{materialize_output, PipelineConfig, SpriteOutput};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};

struct SpriteTask {
    index: usize,
    sprite: Sprite,
    result_sender: oneshot::Sender<(usize, SpriteOutput)>,
}

/// Drop-in parallel variant of `SpritePipeline`. Produces the same outputs in
/// the same order.
pub struct ParallelSpritePipeline {
    config: PipelineConfig,
}

impl ParallelSpritePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs segmentation sequentially, then normalizes and vectorizes the
    /// retained sprites across a worker pool sized to the machine.
    pub async fn process(&self, source: &Raster) -> Vec<SpriteOutput> {
        let prepared = if source.has_transparent_pixel() {
            source.clone()
        } else {
            background::isolate_background(source)
        };
        let labels = region_labeler::label_regions(&prepared);
        let sprites = aggregator::extract_sprites(
            &prepared,
            &labels,
            self.config.top_n_sprites,
            &self.config,
        );
        if sprites.is_empty() {
            return Vec::new();
        }

        let worker_count = num_cpus::get().max(1).min(sprites.len());
        tracing::debug!(
            sprites = sprites.len(),
            workers = worker_count,
            "dispatching sprites to worker pool"
        );

        // One channel per worker, round-robin dispatch.
        let mut worker_senders = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (sender, mut receiver) = mpsc::unbounded_channel::<SpriteTask>();
            let worker_config = self.config.clone();
            tokio::spawn(async move {
                while let Some(task) = receiver.recv().await {
                    let mut sprite = task.sprite;
                    normalizer::normalize_sprite(&mut sprite, &worker_config);
                    let output = materialize_output(sprite, &worker_config);
                    let _ = task.result_sender.send((task.index, output));
                }
            });
            worker_senders.push(sender);
        }

        let sprite_count = sprites.len();
        let mut result_receivers = Vec::new();
        for (index, sprite) in sprites.into_iter().enumerate() {
            let (result_sender, result_receiver) = oneshot::channel();
            let task = SpriteTask {
                index,
                sprite,
                result_sender,
            };
            if worker_senders[index % worker_count].send(task).is_err() {
                tracing::warn!(index, "worker exited early, sprite dropped");
                continue;
            }
            result_receivers.push(result_receiver);
        }
        // Workers exit once every sender is gone and their queues drain.
        drop(worker_senders);

        let mut outputs: Vec<Option<SpriteOutput>> = Vec::new();
        outputs.resize_with(sprite_count, || None);
        for completed in join_all(result_receivers).await {
            if let Ok((index, output)) = completed {
                outputs[index] = Some(output);
            }
        }
        outputs.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SpritePipeline;

    fn three_block_source() -> Raster {
        let mut source = Raster::from_pixels(300, 100, vec![0xFFFFFFFF; 300 * 100]);
        for y in 10..40 {
            for x in 10..40 {
                source.set(x, y, 0xFFFF0000);
            }
        }
        for y in 20..40 {
            for x in 100..140 {
                source.set(x, y, 0xFF00FF00);
            }
        }
        for y in 50..90 {
            for x in 200..280 {
                source.set(x, y, 0xFF0000FF);
            }
        }
        source
    }

    #[tokio::test]
    async fn parallel_output_matches_sequential_output() {
        let source = three_block_source();
        let config = PipelineConfig::default();

        let sequential = SpritePipeline::new(config.clone()).process(&source);
        let parallel = ParallelSpritePipeline::new(config).process(&source).await;

        assert_eq!(sequential.len(), parallel.len());
        for (s, p) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(s.label_id, p.label_id);
            assert_eq!(s.raster, p.raster);
            assert_eq!(s.svg, p.svg);
            assert_eq!(s.center_of_mass, p.center_of_mass);
        }
    }

    #[tokio::test]
    async fn empty_source_produces_no_outputs() {
        let source = Raster::from_pixels(16, 16, vec![0xFF123456; 256]);
        let outputs = ParallelSpritePipeline::new(PipelineConfig::default())
            .process(&source)
            .await;
        assert!(outputs.is_empty());
    }
}
