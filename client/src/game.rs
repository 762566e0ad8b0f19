//! Client-side mirror of the garden session
//!
//! The client owns its basket and decides locally when something was picked
//! up, but only reports the pickup's type. Harvest counters and the win flag
//! are whatever the server last said they were.

use crate::error::ClientError;
use crate::scene::Scene;
use log::{debug, info};
use macroquad::math::{vec3, Quat, Vec3};
use rand::Rng;
use shared::{Controls, Crop, Message, Pickup, ProtocolError, StateSnapshot};
use std::collections::HashMap;

pub const PICKUP_RADIUS: f32 = 2.0;
/// Garden objects are placed uniformly in `[-GARDEN_HALF_EXTENT, GARDEN_HALF_EXTENT]` on x and y.
pub const GARDEN_HALF_EXTENT: f32 = 20.0;
/// Extra copies of each raw crop planted at startup.
pub const INITIAL_CLONES: usize = 5;
pub const GIFT_BANNER_SECS: f32 = 3.0;
/// Basket turn rate in radians per second.
pub const TURN_SPEED: f32 = 1.8;
pub const MOVE_SPEED: f32 = 20.0;

const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 23.0, 8.0);
// Gift templates wait here, out of reach and out of sight.
const PARKED: Vec3 = Vec3::new(0.0, 0.0, -1000.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Playing,
    /// Terminal. Input and pickups stop, server messages still apply.
    Won,
}

/// The locally driven basket. Yaw 0 faces -y, z is up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basket {
    pub position: Vec3,
    pub yaw: f32,
}

impl Basket {
    pub fn new(position: Vec3) -> Self {
        Self { position, yaw: 0.0 }
    }

    pub fn forward(&self) -> Vec3 {
        vec3(self.yaw.sin(), -self.yaw.cos(), 0.0)
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_z(self.yaw)
    }

    /// Turns on left/right and drives on up/down. Opposing keys cancel out.
    pub fn update(&mut self, controls: &Controls, dt: f32) {
        let turn = axis(controls.left.pressed, controls.right.pressed);
        self.yaw += turn * TURN_SPEED * dt;

        let drive = axis(controls.up.pressed, controls.down.pressed);
        self.position += self.forward() * drive * MOVE_SPEED * dt;
    }

    /// Chase camera eye, behind and above the basket.
    pub fn camera_position(&self) -> Vec3 {
        self.position + self.rotation() * CAMERA_OFFSET
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

/// Index-aligned garden objects. An index is never reused; retiring it
/// clears its handle and type.
#[derive(Debug, Clone)]
pub struct Garden<H> {
    handles: Vec<Option<H>>,
    kinds: Vec<Option<u8>>,
    pickup_sent: Vec<bool>,
}

impl<H: Copy> Garden<H> {
    fn new() -> Self {
        Self {
            handles: Vec::new(),
            kinds: Vec::new(),
            pickup_sent: Vec::new(),
        }
    }

    fn push(&mut self, handle: H, kind: u8) -> usize {
        self.handles.push(Some(handle));
        self.kinds.push(Some(kind));
        self.pickup_sent.push(false);
        self.handles.len() - 1
    }

    fn retire(&mut self, index: usize) {
        self.handles[index] = None;
        self.kinds[index] = None;
    }

    fn rearm(&mut self, index: usize) {
        self.pickup_sent[index] = false;
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handle(&self, index: usize) -> Option<H> {
        self.handles.get(index).copied().flatten()
    }

    pub fn kind(&self, index: usize) -> Option<u8> {
        self.kinds.get(index).copied().flatten()
    }

    pub fn pickup_sent(&self, index: usize) -> bool {
        self.pickup_sent.get(index).copied().unwrap_or(false)
    }

    pub fn live_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_some()).count()
    }
}

pub struct ClientGame<S: Scene> {
    pub controls: Controls,
    pub basket: Basket,
    basket_root: S::Handle,
    garden: Garden<S::Handle>,
    templates: HashMap<Crop, S::Handle>,
    state: Option<StateSnapshot>,
    mode: Mode,
    gift_banner: Option<f32>,
}

impl<S: Scene> ClientGame<S> {
    /// Plants the garden: the six prototypes go to random spots and each raw
    /// crop gets [`INITIAL_CLONES`] extra copies. Fails if a required root is
    /// missing from the scene.
    pub fn new<R: Rng>(scene: &mut S, rng: &mut R) -> Result<Self, ClientError> {
        let basket_root = require(scene, "basket_root")?;
        require(scene, "ground_root")?;

        let mut garden = Garden::new();
        let mut crop_roots = Vec::with_capacity(Crop::ALL.len());
        for crop in Crop::ALL {
            let crop_root = require(scene, &format!("{}_root", crop))?;
            let seeds_root = require(scene, &format!("{}_seeds_root", crop))?;

            scene.set_position(crop_root, random_spot(rng));
            garden.push(crop_root, crop.code());
            scene.set_position(seeds_root, random_spot(rng));
            garden.push(seeds_root, crop.seed_code());
            crop_roots.push((crop, crop_root));
        }

        for &(crop, root) in &crop_roots {
            for _ in 0..INITIAL_CLONES {
                let clone = duplicate(scene, root, "_init", crop)?;
                scene.set_position(clone, random_spot(rng));
                garden.push(clone, crop.code());
            }
        }

        let mut templates = HashMap::new();
        for &(crop, root) in &crop_roots {
            let template = duplicate(scene, root, "_template", crop)?;
            scene.set_position(template, PARKED);
            templates.insert(crop, template);
        }

        let basket = Basket::new(scene.position(basket_root).unwrap_or(Vec3::ZERO));
        debug!("Planted {} garden objects", garden.len());

        Ok(Self {
            controls: Controls::default(),
            basket,
            basket_root,
            garden,
            templates,
            state: None,
            mode: Mode::Playing,
            gift_banner: None,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn garden(&self) -> &Garden<S::Handle> {
        &self.garden
    }

    /// Last snapshot received from the server.
    pub fn state(&self) -> Option<&StateSnapshot> {
        self.state.as_ref()
    }

    pub fn gift_banner_visible(&self) -> bool {
        self.gift_banner.is_some()
    }

    /// This frame's controls report. Press counts start over afterwards.
    pub fn controls_message(&mut self) -> Message {
        let message = Message::Controls(self.controls);
        self.controls.reset_downs();
        message
    }

    /// Applies one message from the server.
    pub fn apply<R: Rng>(
        &mut self,
        scene: &mut S,
        rng: &mut R,
        message: Message,
    ) -> Result<(), ClientError> {
        match message {
            Message::State(snapshot) => {
                if snapshot.win {
                    self.enter_won();
                }
                self.state = Some(snapshot);
            }
            Message::Gift(crop) => {
                let index = self.spawn_gift(scene, rng, crop)?;
                info!("Received a {} gift (garden object {})", crop, index);
            }
            Message::Win => self.enter_won(),
            other => return Err(ProtocolError::UnexpectedMessage(other.kind()).into()),
        }
        Ok(())
    }

    pub fn apply_all<R: Rng>(
        &mut self,
        scene: &mut S,
        rng: &mut R,
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<(), ClientError> {
        for message in messages {
            self.apply(scene, rng, message)?;
        }
        Ok(())
    }

    /// Advances local simulation by `dt` seconds and returns the pickups to
    /// report.
    pub fn update<R: Rng>(&mut self, scene: &mut S, rng: &mut R, dt: f32) -> Vec<Message> {
        if let Some(elapsed) = self.gift_banner.as_mut() {
            *elapsed += dt;
            if *elapsed >= GIFT_BANNER_SECS {
                self.gift_banner = None;
            }
        }

        if self.mode == Mode::Won {
            return Vec::new();
        }

        self.basket.update(&self.controls, dt);
        scene.set_position(self.basket_root, self.basket.position);
        scene.set_rotation(self.basket_root, self.basket.rotation());

        self.detect_pickups(scene, rng)
    }

    fn detect_pickups<R: Rng>(&mut self, scene: &mut S, rng: &mut R) -> Vec<Message> {
        let mut pickups = Vec::new();
        for index in 0..self.garden.len() {
            let (Some(handle), Some(kind)) = (self.garden.handle(index), self.garden.kind(index))
            else {
                continue;
            };
            if self.garden.pickup_sent(index) {
                continue;
            }
            let Some(position) = scene.position(handle) else {
                continue;
            };
            if planar_distance(self.basket.position, position) > PICKUP_RADIUS {
                continue;
            }

            self.garden.pickup_sent[index] = true;
            pickups.push(Message::Pickup(kind));

            match Pickup::from(kind) {
                Pickup::Seed(crop) => {
                    debug!("Picked up {} seeds (garden object {})", crop, index);
                    scene.set_position(handle, random_spot(rng));
                    self.garden.rearm(index);
                }
                _ => {
                    debug!("Picked up garden object {} (type {})", index, kind);
                    scene.remove(handle);
                    self.garden.retire(index);
                }
            }
        }
        pickups
    }

    fn spawn_gift<R: Rng>(
        &mut self,
        scene: &mut S,
        rng: &mut R,
        crop: Crop,
    ) -> Result<usize, ClientError> {
        let template = self
            .templates
            .get(&crop)
            .copied()
            .ok_or_else(|| ClientError::MissingSceneObject(format!("{}_root_template", crop)))?;
        let handle = duplicate(scene, template, "_gift", crop)?;
        scene.set_position(handle, random_spot(rng));

        self.gift_banner = Some(0.0);
        Ok(self.garden.push(handle, crop.code()))
    }

    fn enter_won(&mut self) {
        if self.mode == Mode::Won {
            return;
        }
        self.mode = Mode::Won;
        match &self.state {
            Some(state) => info!("The garden has been won! Harvest: {}", state.harvest),
            None => info!("The garden has been won!"),
        }
    }
}

fn require<S: Scene>(scene: &S, name: &str) -> Result<S::Handle, ClientError> {
    scene
        .find(name)
        .ok_or_else(|| ClientError::MissingSceneObject(name.to_string()))
}

fn duplicate<S: Scene>(
    scene: &mut S,
    root: S::Handle,
    suffix: &str,
    crop: Crop,
) -> Result<S::Handle, ClientError> {
    scene
        .duplicate(root, suffix)
        .ok_or_else(|| ClientError::MissingSceneObject(format!("{}_root", crop)))
}

fn random_spot<R: Rng>(rng: &mut R) -> Vec3 {
    vec3(
        rng.gen_range(-GARDEN_HALF_EXTENT..=GARDEN_HALF_EXTENT),
        rng.gen_range(-GARDEN_HALF_EXTENT..=GARDEN_HALF_EXTENT),
        0.0,
    )
}

fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}
