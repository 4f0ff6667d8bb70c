// Particle field core: owns the particle collection, the surface dimensions
// and the animation loop state. Host specifics (canvas, requestAnimationFrame,
// media queries) stay outside; they come in through the Renderer and
// FrameScheduler traits so this logic runs without a browser.

use rand::Rng;

use crate::color::Color;
use crate::particle::Particle;
use crate::renderer::Renderer;
use crate::scheduler::FrameScheduler;

const SATURATION: f64 = 0.70;
const LIGHTNESS: f64 = 0.62;

// Tuning constants for the field. All fixed at mount time.
pub struct FieldConfig {
    pub max_particles: usize,
    /// Surface area (px²) per particle before the cap kicks in.
    pub density_divisor: f64,
    /// Velocity components are drawn from [-max_speed, max_speed] px/tick.
    pub max_speed: f64,
    pub radius_range: (f64, f64),
    pub opacity_range: (f64, f64),
    /// Hue band in degrees; the defaults stay inside the indigo/violet
    /// brand palette.
    pub hue_range: (f64, f64),
    /// Pairs closer than this get a connecting line.
    pub connect_distance: f64,
    pub max_line_opacity: f64,
}

impl Default for FieldConfig {
    fn default() -> FieldConfig {
        FieldConfig {
            max_particles: 80,
            density_divisor: 12_000.0,
            max_speed: 0.4,
            radius_range: (1.0, 3.0),
            opacity_range: (0.2, 0.7),
            hue_range: (220.0, 280.0),
            connect_distance: 120.0,
            max_line_opacity: 0.25,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LoopState {
    Stopped,
    Running,
}

pub struct ParticleField {
    config: FieldConfig,
    width: u32,
    height: u32,
    particles: Vec<Particle>,
    state: LoopState,
    // Handle of the one scheduled frame while Running. At most one frame is
    // ever outstanding; restart cancels it before scheduling another.
    pending: Option<i32>,
}

impl ParticleField {
    pub fn new(config: FieldConfig) -> ParticleField {
        debug_assert!(config.density_divisor > 0.0);
        ParticleField {
            config,
            width: 0,
            height: 0,
            particles: Vec::new(),
            state: LoopState::Stopped,
            pending: None,
        }
    }

    /// Particle count for a surface: one per `density_divisor` px² of area,
    /// capped at `max_particles`. Zero area means zero particles.
    pub fn target_count(&self, width: u32, height: u32) -> usize {
        let area = width as f64 * height as f64;
        let count = (area / self.config.density_divisor).floor() as usize;
        count.min(self.config.max_particles)
    }

    /// Regenerates the whole collection against a new surface size. Nothing
    /// from the previous generation survives.
    pub fn init<R: Rng>(&mut self, width: u32, height: u32, rng: &mut R) {
        self.width = width;
        self.height = height;
        let count = self.target_count(width, height);
        self.particles.clear();
        self.particles.reserve(count);
        let (min_radius, max_radius) = self.config.radius_range;
        let (min_opacity, max_opacity) = self.config.opacity_range;
        let (min_hue, max_hue) = self.config.hue_range;
        for _ in 0..count {
            let pos = [
                rng.gen::<f64>() * width as f64,
                rng.gen::<f64>() * height as f64,
            ];
            let vel = [
                (rng.gen::<f64>() * 2.0 - 1.0) * self.config.max_speed,
                (rng.gen::<f64>() * 2.0 - 1.0) * self.config.max_speed,
            ];
            let radius = rng.gen::<f64>() * (max_radius - min_radius) + min_radius;
            let opacity = rng.gen::<f64>() * (max_opacity - min_opacity) + min_opacity;
            let hue = rng.gen::<f64>() * (max_hue - min_hue) + min_hue;
            self.particles.push(Particle::new(pos, vel, radius, opacity, hue));
        }
    }

    /// Advances every particle one tick. The boundary test runs against the
    /// moved position, not the old one; testing first would let a fast
    /// particle tunnel through an edge. The overshoot is mirrored back
    /// inside rather than clamped, so motion stays continuous and every
    /// position ends the tick within [0, width] x [0, height].
    pub fn update(&mut self) {
        let width = self.width as f64;
        let height = self.height as f64;
        for particle in &mut self.particles {
            particle.pos[0] += particle.vel[0];
            particle.pos[1] += particle.vel[1];
            if particle.pos[0] < 0.0 {
                particle.pos[0] = -particle.pos[0];
                particle.vel[0] = -particle.vel[0];
            } else if particle.pos[0] > width {
                particle.pos[0] = 2.0 * width - particle.pos[0];
                particle.vel[0] = -particle.vel[0];
            }
            if particle.pos[1] < 0.0 {
                particle.pos[1] = -particle.pos[1];
                particle.vel[1] = -particle.vel[1];
            } else if particle.pos[1] > height {
                particle.pos[1] = 2.0 * height - particle.pos[1];
                particle.vel[1] = -particle.vel[1];
            }
        }
    }

    /// Draws one frame: dots first, then a connecting line for every pair
    /// closer than the threshold, fading linearly to nothing at the
    /// threshold distance. Pairwise scan, O(n²) in particle count; raising
    /// max_particles past a few hundred needs a spatial grid first.
    pub fn render<D: Renderer>(&self, renderer: &mut D) {
        renderer.clear(self.width, self.height);
        for particle in &self.particles {
            let color = Color::from_hsl(particle.hue, SATURATION, LIGHTNESS);
            renderer.fill_circle(particle.pos, particle.radius, color, particle.opacity);
        }
        for i in 0..self.particles.len() {
            for j in (i + 1)..self.particles.len() {
                let a = &self.particles[i];
                let b = &self.particles[j];
                let distance = vecmath::vec2_len(vecmath::vec2_sub(b.pos, a.pos));
                if distance < self.config.connect_distance {
                    let alpha = (1.0 - distance / self.config.connect_distance)
                        * self.config.max_line_opacity;
                    let color = Color::from_hsl(a.hue, SATURATION, LIGHTNESS);
                    renderer.stroke_line(a.pos, b.pos, color, alpha);
                }
            }
        }
    }

    /// Frame callback body: advance, draw, re-schedule. Does nothing when
    /// the loop was cancelled before the callback ran.
    pub fn animate<D: Renderer, S: FrameScheduler>(&mut self, renderer: &mut D, scheduler: &mut S) {
        self.pending = None;
        if self.state != LoopState::Running {
            return;
        }
        self.update();
        self.render(renderer);
        self.pending = scheduler.schedule();
        if self.pending.is_none() {
            self.state = LoopState::Stopped;
        }
    }

    /// Stopped -> Running. Schedules the first frame; a second start while
    /// already Running is a no-op, so two loops can never coexist.
    pub fn start<S: FrameScheduler>(&mut self, scheduler: &mut S) {
        if self.state == LoopState::Running {
            return;
        }
        self.pending = scheduler.schedule();
        self.state = if self.pending.is_some() {
            LoopState::Running
        } else {
            LoopState::Stopped
        };
    }

    /// Running -> Stopped. Revokes the scheduled frame so no further frames
    /// fire and nothing re-schedules.
    pub fn cancel<S: FrameScheduler>(&mut self, scheduler: &mut S) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel(handle);
        }
        self.state = LoopState::Stopped;
    }

    /// Resize-restart transition: cancel whatever is in flight, regenerate
    /// for the new surface, then resume (or render the one static
    /// reduced-motion frame).
    pub fn restart<R: Rng, D: Renderer, S: FrameScheduler>(
        &mut self,
        width: u32,
        height: u32,
        reduced_motion: bool,
        rng: &mut R,
        renderer: &mut D,
        scheduler: &mut S,
    ) {
        self.cancel(scheduler);
        self.init(width, height, rng);
        self.apply_motion_preference(reduced_motion, renderer, scheduler);
    }

    /// Reduced motion halts the loop and leaves a single static frame on
    /// the surface; lifting the preference starts the loop again.
    pub fn apply_motion_preference<D: Renderer, S: FrameScheduler>(
        &mut self,
        reduced_motion: bool,
        renderer: &mut D,
        scheduler: &mut S,
    ) {
        if reduced_motion {
            self.cancel(scheduler);
            self.render(renderer);
        } else {
            self.start(scheduler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct RecordingRenderer {
        clears: usize,
        circles: Vec<([f64; 2], f64, f64)>,
        lines: Vec<([f64; 2], [f64; 2], f64)>,
    }

    impl Renderer for RecordingRenderer {
        fn resize_surface(&mut self, _width: u32, _height: u32) {}

        fn clear(&mut self, _width: u32, _height: u32) {
            self.clears += 1;
        }

        fn fill_circle(&mut self, center: [f64; 2], radius: f64, _color: Color, alpha: f64) {
            self.circles.push((center, radius, alpha));
        }

        fn stroke_line(&mut self, from: [f64; 2], to: [f64; 2], _color: Color, alpha: f64) {
            self.lines.push((from, to, alpha));
        }
    }

    #[derive(Default)]
    struct MockScheduler {
        next_handle: i32,
        outstanding: Vec<i32>,
        refuse: bool,
    }

    impl MockScheduler {
        // The host invoking a callback consumes its handle.
        fn consume(&mut self, handle: i32) {
            self.outstanding.retain(|h| *h != handle);
        }
    }

    impl FrameScheduler for MockScheduler {
        fn schedule(&mut self) -> Option<i32> {
            if self.refuse {
                return None;
            }
            self.next_handle += 1;
            self.outstanding.push(self.next_handle);
            Some(self.next_handle)
        }

        fn cancel(&mut self, handle: i32) {
            self.outstanding.retain(|h| *h != handle);
        }
    }

    fn seeded_field() -> (ParticleField, SmallRng) {
        (
            ParticleField::new(FieldConfig::default()),
            SmallRng::seed_from_u64(0x5eed),
        )
    }

    // Lets a scheduled frame fire, the way the host event loop would.
    fn fire(field: &mut ParticleField, renderer: &mut RecordingRenderer, sched: &mut MockScheduler) {
        let handle = field.pending.expect("a frame should be scheduled");
        sched.consume(handle);
        field.animate(renderer, sched);
    }

    #[test]
    fn particle_count_follows_surface_area() {
        let (field, _) = seeded_field();
        assert_eq!(field.target_count(0, 0), 0);
        assert_eq!(field.target_count(50, 50), 0);
        assert_eq!(field.target_count(200, 100), 1);
        assert_eq!(field.target_count(800, 600), 40);
        // 1920x1080 would want 172 particles; the cap wins.
        assert_eq!(field.target_count(1920, 1080), 80);
    }

    #[test]
    fn init_respects_configured_ranges() {
        let (mut field, mut rng) = seeded_field();
        field.init(800, 600, &mut rng);
        assert_eq!(field.particles.len(), 40);
        for p in &field.particles {
            assert!(p.pos[0] >= 0.0 && p.pos[0] <= 800.0);
            assert!(p.pos[1] >= 0.0 && p.pos[1] <= 600.0);
            assert!(p.vel[0].abs() <= 0.4);
            assert!(p.vel[1].abs() <= 0.4);
            assert!(p.radius >= 1.0 && p.radius <= 3.0);
            assert!(p.opacity >= 0.2 && p.opacity <= 0.7);
            assert!(p.hue >= 220.0 && p.hue <= 280.0);
        }
    }

    #[test]
    fn update_keeps_every_particle_inside_the_surface() {
        let (mut field, mut rng) = seeded_field();
        field.init(300, 200, &mut rng);
        for _ in 0..10_000 {
            field.update();
            for p in &field.particles {
                assert!(p.pos[0] >= 0.0 && p.pos[0] <= 300.0);
                assert!(p.pos[1] >= 0.0 && p.pos[1] <= 200.0);
            }
        }
    }

    #[test]
    fn boundary_contact_reflects_instead_of_clamping() {
        let (mut field, mut rng) = seeded_field();
        field.init(300, 200, &mut rng);
        field.particles.clear();
        field
            .particles
            .push(Particle::new([1.0, 50.0], [-2.5, 0.0], 2.0, 0.5, 240.0));
        field.update();
        let p = &field.particles[0];
        // -1.5 mirrored back to 1.5, velocity flipped; a clamp would have
        // pinned it to 0.
        assert!((p.pos[0] - 1.5).abs() < 1e-12);
        assert!((p.vel[0] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn lines_fade_with_distance_and_stop_at_threshold() {
        let (mut field, mut rng) = seeded_field();
        field.init(400, 300, &mut rng);

        let alpha_at = |field: &mut ParticleField, distance: f64| -> Option<f64> {
            field.particles.clear();
            field
                .particles
                .push(Particle::new([100.0, 100.0], [0.0, 0.0], 2.0, 0.5, 240.0));
            field.particles.push(Particle::new(
                [100.0 + distance, 100.0],
                [0.0, 0.0],
                2.0,
                0.5,
                240.0,
            ));
            let mut renderer = RecordingRenderer::default();
            field.render(&mut renderer);
            renderer.lines.first().map(|line| line.2)
        };

        let near = alpha_at(&mut field, 30.0).unwrap();
        let mid = alpha_at(&mut field, 60.0).unwrap();
        let far = alpha_at(&mut field, 110.0).unwrap();
        assert!(near > mid && mid > far);
        assert!((mid - 0.125).abs() < 1e-12);
        assert!(far < 0.025);
        // At and past the threshold no line is drawn at all.
        assert_eq!(alpha_at(&mut field, 120.0), None);
        assert_eq!(alpha_at(&mut field, 200.0), None);
    }

    #[test]
    fn reduced_motion_renders_once_and_never_schedules() {
        let (mut field, mut rng) = seeded_field();
        let mut renderer = RecordingRenderer::default();
        let mut sched = MockScheduler::default();
        field.restart(800, 600, true, &mut rng, &mut renderer, &mut sched);
        assert_eq!(renderer.clears, 1);
        assert_eq!(field.state, LoopState::Stopped);
        assert!(sched.outstanding.is_empty());
        // A stray refresh tick after the fact draws nothing and schedules
        // nothing.
        field.animate(&mut renderer, &mut sched);
        assert_eq!(renderer.clears, 1);
        assert!(sched.outstanding.is_empty());
    }

    #[test]
    fn restart_regenerates_for_the_new_surface() {
        let (mut field, mut rng) = seeded_field();
        let mut renderer = RecordingRenderer::default();
        let mut sched = MockScheduler::default();
        field.init(400, 300, &mut rng);
        let old_positions: Vec<[f64; 2]> = field.particles.iter().map(|p| p.pos).collect();
        assert_eq!(old_positions.len(), 10);

        field.restart(1000, 800, false, &mut rng, &mut renderer, &mut sched);
        assert_eq!(field.particles.len(), field.target_count(1000, 800));
        assert_eq!(field.particles.len(), 66);
        for p in &field.particles {
            assert!(p.pos[0] >= 0.0 && p.pos[0] <= 1000.0);
            assert!(p.pos[1] >= 0.0 && p.pos[1] <= 800.0);
            assert!(!old_positions.contains(&p.pos));
        }
    }

    #[test]
    fn rapid_restarts_leave_exactly_one_live_loop() {
        let (mut field, mut rng) = seeded_field();
        let mut renderer = RecordingRenderer::default();
        let mut sched = MockScheduler::default();
        field.restart(400, 300, false, &mut rng, &mut renderer, &mut sched);
        field.restart(500, 400, false, &mut rng, &mut renderer, &mut sched);
        field.restart(600, 500, false, &mut rng, &mut renderer, &mut sched);
        assert_eq!(sched.outstanding.len(), 1);
        assert_eq!(field.state, LoopState::Running);
        // The surviving loop keeps running one frame at a time.
        fire(&mut field, &mut renderer, &mut sched);
        assert_eq!(sched.outstanding.len(), 1);
        fire(&mut field, &mut renderer, &mut sched);
        assert_eq!(sched.outstanding.len(), 1);
        assert_eq!(renderer.clears, 2);
    }

    #[test]
    fn start_twice_schedules_once() {
        let (mut field, _) = seeded_field();
        let mut sched = MockScheduler::default();
        field.start(&mut sched);
        field.start(&mut sched);
        assert_eq!(sched.outstanding.len(), 1);
    }

    #[test]
    fn refused_scheduling_leaves_the_loop_stopped() {
        let (mut field, _) = seeded_field();
        let mut sched = MockScheduler {
            refuse: true,
            ..MockScheduler::default()
        };
        field.start(&mut sched);
        assert_eq!(field.state, LoopState::Stopped);
        assert!(field.pending.is_none());
    }

    #[test]
    fn zero_area_surface_is_harmless() {
        let (mut field, mut rng) = seeded_field();
        let mut renderer = RecordingRenderer::default();
        field.init(0, 0, &mut rng);
        assert!(field.particles.is_empty());
        field.update();
        field.render(&mut renderer);
        assert_eq!(renderer.clears, 1);
        assert!(renderer.circles.is_empty());
        assert!(renderer.lines.is_empty());
    }
}
