//! Deferred draw commands executed in horizontal tiles.

use rayon::prelude::*;
use tracing::debug;

use crate::buf::Allocation;
use crate::math::IRect;
use crate::pipeline::DrawCommand;
use crate::thread_pool::ThreadPool;

/// Draw commands in submission order.
///
/// Commands borrow their target images and textures, so the queue cannot outlive them. Like
/// the images it draws to, a queue stays on the thread that built it. Only its execution fans
/// out to worker threads.
#[derive(Default)]
pub struct CommandQueue<'a> {
    commands: Vec<DrawCommand<'a>>,
}

impl<'a> CommandQueue<'a> {
    pub fn new() -> Self {
        CommandQueue { commands: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CommandQueue {
            commands: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, command: DrawCommand<'a>) {
        self.commands.push(command);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[DrawCommand<'a>] {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut [DrawCommand<'a>] {
        &mut self.commands
    }

    /// Runs every command inside `clip`.
    ///
    /// With `job_count > 1` the clip rectangle is split into that many horizontal tiles that
    /// start on even rows and run in parallel on the current `rayon` pool. Each tile runs the
    /// whole queue in order, so the result only depends on the tiling where alpha blended
    /// triangles cross a tile edge.
    pub fn execute(&self, clip: IRect, job_count: usize) {
        if let Some((jobs, tiles)) = self.split(clip, job_count) {
            tiles.into_par_iter().for_each(|tile| jobs.run(tile));
        }
    }

    /// Like [`CommandQueue::execute`] on the workers of `pool`.
    pub fn execute_on(&self, pool: &ThreadPool, clip: IRect, job_count: usize) {
        if let Some((jobs, tiles)) = self.split(clip, job_count) {
            pool.install(|| tiles.into_par_iter().for_each(|tile| jobs.run(tile)));
        }
    }

    /// Tiles for the workers and the commands they share. Queues that need only one tile, or
    /// whose targets alias each other at different rows, run here and return `None`.
    fn split(&self, clip: IRect, job_count: usize) -> Option<(TileJobs<'_, 'a>, Vec<IRect>)> {
        if self.commands.is_empty() || clip.is_empty() {
            return None;
        }
        if job_count > 1 {
            if rows_map_alike(&self.commands) {
                let tiles = clip.split_rows(job_count);
                debug!(commands = self.commands.len(), tiles = tiles.len(), "executing queue");
                return Some((TileJobs { commands: &self.commands }, tiles));
            }
            debug!("targets share pixels at different rows, executing on one thread");
        }
        debug!(commands = self.commands.len(), "executing queue");
        execute_tile(&self.commands, clip);
        None
    }
}

fn execute_tile(commands: &[DrawCommand<'_>], tile: IRect) {
    for command in commands {
        command.execute(tile);
    }
}

/// Commands handed to the workers of one dispatch.
struct TileJobs<'q, 'a> {
    commands: &'q [DrawCommand<'a>],
}

impl TileJobs<'_, '_> {
    fn run(&self, tile: IRect) {
        execute_tile(self.commands, tile);
    }
}

// SAFETY: workers only run `DrawCommand::execute` on their own tile. Tiles come from
// `IRect::split_rows` and never share a row, `rows_map_alike` held when the jobs were built,
// so a row of one target never aliases a different row of another. Images are not `Send`, so
// the thread owning every target is the one blocked in the dispatch until all workers return.
// Textures are only read.
unsafe impl Sync for TileJobs<'_, '_> {}

/// True if targets sharing an allocation all start on the same row of it.
fn rows_map_alike(commands: &[DrawCommand<'_>]) -> bool {
    let mut origins: Vec<(*const Allocation, usize)> = Vec::new();
    let targets = commands
        .iter()
        .flat_map(|command| {
            let target = &command.target;
            [Some(target.color.row_origin()), target.depth.map(|depth| depth.row_origin())]
        })
        .flatten();
    for (alloc, row) in targets {
        match origins.iter().find(|(seen, _)| *seen == alloc) {
            Some(&(_, first)) if first != row => return false,
            Some(_) => {}
            None => origins.push((alloc, row)),
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buf::ImageRgbaU8;
    use crate::camera::{Camera, Transform3D};
    use crate::pipeline::{render_triangle_from_data, Filter, TriangleInput};
    use crate::vec::{Vec3, Vec4};

    #[test]
    fn tiles_reproduce_the_sequential_result() {
        let camera = Camera::orthogonal(Transform3D::IDENTITY, 37, 29, 1.0, 0.0, 10.0).unwrap();
        let sequential = ImageRgbaU8::new(37, 29).unwrap();
        let tiled = ImageRgbaU8::new(37, 29).unwrap();
        let input = TriangleInput {
            colors: [Vec4::new(1.0, 0.0, 0.0, 1.0), Vec4::new(0.0, 1.0, 0.0, 1.0), Vec4::new(0.0, 0.0, 1.0, 1.0)],
            ..TriangleInput::default()
        };
        let corners = [Vec3::new(-0.9, 0.8, 1.0), Vec3::new(0.95, 0.1, 1.0), Vec3::new(-0.2, -0.9, 1.0)];

        let mut first = CommandQueue::new();
        let mut second = CommandQueue::new();
        for (queue, image) in [(&mut first, &sequential), (&mut second, &tiled)] {
            let [a, b, c] = corners;
            render_triangle_from_data(Some(queue), image, None, &camera, a, b, c, Filter::Solid, &input);
        }
        assert_eq!(first.len(), 1);
        first.execute(sequential.rect(), 1);
        second.execute(tiled.rect(), 5);
        assert!(sequential.to_vec().iter().any(|&p| p != 0));
        assert_eq!(sequential.to_vec(), tiled.to_vec());

        second.clear();
        assert!(second.is_empty());
    }

    #[test]
    fn overlapping_sub_images_run_on_one_thread() {
        let camera = Camera::orthogonal(Transform3D::IDENTITY, 8, 8, 1.0, 0.0, 10.0).unwrap();
        let draw = |jobs: usize| {
            let parent = ImageRgbaU8::new(8, 16).unwrap();
            let top = parent.sub_image(IRect::new(0, 0, 8, 8)).unwrap();
            let shifted = parent.sub_image(IRect::new(0, 3, 8, 8)).unwrap();
            let mut queue = CommandQueue::new();
            for (image, red) in [(&top, 1.0), (&shifted, 0.0)] {
                let input = TriangleInput {
                    colors: [Vec4::new(red, 1.0 - red, 0.0, 1.0); 3],
                    ..TriangleInput::default()
                };
                let [a, b, c] = [Vec3::new(-1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0), Vec3::new(-1.0, -1.0, 1.0)];
                render_triangle_from_data(Some(&mut queue), image, None, &camera, a, b, c, Filter::Solid, &input);
            }
            assert!(!rows_map_alike(queue.commands()));
            queue.execute(top.rect(), jobs);
            parent.to_vec()
        };
        let sequential = draw(1);
        assert!(sequential.contains(&0xff00_00ff) && sequential.contains(&0xff00_ff00));
        assert_eq!(sequential, draw(4));
    }

    #[test]
    fn clones_of_one_target_may_share_tiles() {
        let camera = Camera::orthogonal(Transform3D::IDENTITY, 8, 8, 1.0, 0.0, 10.0).unwrap();
        let image = ImageRgbaU8::new(8, 8).unwrap();
        let clone = image.clone();
        let mut queue = CommandQueue::new();
        let input = TriangleInput::default();
        for target in [&image, &clone] {
            let [a, b, c] = [Vec3::new(-1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0), Vec3::new(-1.0, -1.0, 1.0)];
            render_triangle_from_data(Some(&mut queue), target, None, &camera, a, b, c, Filter::Solid, &input);
        }
        assert!(rows_map_alike(queue.commands()));
        let pool = ThreadPool::new(2).unwrap();
        queue.execute_on(&pool, image.rect(), 4);
        assert_eq!(image.to_vec().iter().filter(|&&p| p == u32::MAX).count(), 36);
    }
}
