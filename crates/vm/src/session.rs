//! A running game: instances, rooms, events, and the state natives touch.

use std::collections::BTreeMap;
use std::mem;
use std::rc::Rc;
use std::time::Instant;

use luna_common::{LValue, Program};
use luna_container::Game;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::arena::Arena;
use crate::domain::{Domain, FIRST_INSTANCE_ID};
use crate::error::RuntimeError;
use crate::event::{EventContext, EventType, STEP_BEGIN, STEP_END, STEP_NORMAL};
use crate::host::{HeadlessPlatform, Platform, RecordingRenderer, Renderer};
use crate::instance::Instance;
use crate::machine::{Machine, DEFAULT_MAX_CALL_DEPTH};
use crate::registry::NativeRegistry;
use crate::scope::Scopes;

/// Limit on nested code runs, such as a Create event that runs while
/// another event's native creates an instance.
const MAX_NESTED_RUNS: usize = 256;

/// Key/value pairs of one `ds_map`, in insertion order.
pub type DsMap = Vec<(LValue, LValue)>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Seed for `random` and `irandom`.
    pub seed: u64,
    /// Values for `parameter_count` and `parameter_string`.
    pub parameters: Vec<String>,
    pub max_call_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            parameters: Vec::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

pub struct Session {
    game: Rc<Game>,
    config: SessionConfig,
    pub(crate) scopes: Scopes,
    pub(crate) natives: NativeRegistry,
    instances: BTreeMap<u32, Instance>,
    next_instance: u32,
    pub(crate) lists: Arena<Vec<LValue>>,
    pub(crate) maps: Arena<DsMap>,
    pub(crate) renderer: Box<dyn Renderer>,
    pub(crate) platform: Box<dyn Platform>,
    pub(crate) rng: StdRng,
    room: Option<usize>,
    pending_room: Option<usize>,
    events: Vec<EventContext>,
    started: Instant,
    frames: u64,
    nested: usize,
}

impl Session {
    /// A session with headless hosts.
    pub fn new(game: Game, config: SessionConfig) -> Result<Self, RuntimeError> {
        Self::with_hosts(
            game,
            config,
            Box::new(RecordingRenderer::new()),
            Box::new(HeadlessPlatform::new()),
        )
    }

    pub fn with_hosts(
        game: Game,
        config: SessionConfig,
        renderer: Box<dyn Renderer>,
        platform: Box<dyn Platform>,
    ) -> Result<Self, RuntimeError> {
        let natives = NativeRegistry::standard()?;
        debug!(natives = natives.len(), seed = config.seed, "session created");
        let session = Self {
            game: Rc::new(game),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            scopes: Scopes::new(),
            natives,
            instances: BTreeMap::new(),
            next_instance: FIRST_INSTANCE_ID,
            lists: Arena::new(),
            maps: Arena::new(),
            renderer,
            platform,
            room: None,
            pending_room: None,
            events: Vec::new(),
            started: Instant::now(),
            frames: 0,
            nested: 0,
        };
        for name in session.unresolved_functions() {
            warn!(function = %name, "function is neither a native nor a script");
        }
        Ok(session)
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut Scopes {
        &mut self.scopes
    }

    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// Lets a host add its own natives.
    pub fn natives_mut(&mut self) -> &mut NativeRegistry {
        &mut self.natives
    }

    pub fn room(&self) -> Option<usize> {
        self.room
    }

    pub fn pending_room(&self) -> Option<usize> {
        self.pending_room
    }

    /// Completed frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    pub fn instance(&self, id: u32) -> Option<&Instance> {
        self.instances.get(&id)
    }

    /// Live instances in creation order.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Names in the container's function table that resolve to neither a
    /// registered native nor a script. Calls to them fail at run time.
    pub fn unresolved_functions(&self) -> Vec<Rc<str>> {
        self.game
            .functions
            .iter()
            .filter(|f| {
                !self.natives.contains(&f.name) && self.game.script_code(&f.name).is_none()
            })
            .map(|f| Rc::clone(&f.name))
            .collect()
    }

    pub(crate) fn script_program(&self, name: &str) -> Option<Rc<Program>> {
        let code = self.game.script_code(name)?;
        self.game.program(code).cloned()
    }

    /// Runs a program in `domain`. The domain is handed back even when the
    /// program fails.
    pub fn run_program(
        &mut self,
        program: Rc<Program>,
        domain: &mut Domain,
    ) -> Result<LValue, RuntimeError> {
        if self.nested >= MAX_NESTED_RUNS {
            return Err(RuntimeError::CallDepthExceeded {
                at: 0,
                limit: MAX_NESTED_RUNS,
            });
        }
        self.nested += 1;
        let mut machine = Machine::new(self, program, mem::take(domain));
        let result = machine.execute();
        *domain = machine.into_domain();
        self.nested -= 1;
        result
    }

    /// Runs the code entry called `name`.
    pub fn run_code(&mut self, name: &str, domain: &mut Domain) -> Result<LValue, RuntimeError> {
        let program = self
            .game
            .program_by_name(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownCode {
                name: name.to_string(),
            })?;
        self.run_program(program, domain)
    }

    fn run_code_index(&mut self, code: usize, domain: &mut Domain) -> Result<LValue, RuntimeError> {
        let program = self
            .game
            .program(code)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownCode {
                name: format!("#{code}"),
            })?;
        self.run_program(program, domain)
    }

    /// Adds an instance without running any of its events.
    pub fn create_instance(
        &mut self,
        x: f64,
        y: f64,
        depth: f64,
        object: usize,
    ) -> Result<u32, RuntimeError> {
        let persistent = self
            .game
            .objects
            .get(object)
            .ok_or(RuntimeError::UnknownObject {
                index: object as i64,
            })?
            .persistent;
        let id = self.next_instance;
        self.next_instance += 1;
        self.instances
            .insert(id, Instance::new(id, object, persistent, x, y, depth));
        Ok(id)
    }

    /// Creates an instance and runs its PreCreate and Create events.
    pub fn spawn_instance(
        &mut self,
        x: f64,
        y: f64,
        depth: f64,
        object: usize,
    ) -> Result<u32, RuntimeError> {
        let id = self.create_instance(x, y, depth, object)?;
        self.run_event(id, EventType::PreCreate, 0)?;
        self.run_event(id, EventType::Create, 0)?;
        Ok(id)
    }

    /// Runs the Destroy and CleanUp events of an instance, then removes it.
    pub fn destroy_instance(&mut self, id: u32) -> Result<(), RuntimeError> {
        if !self.instances.contains_key(&id) {
            return Err(RuntimeError::UnknownInstance { id: id.into() });
        }
        self.run_event(id, EventType::Destroy, 0)?;
        self.run_event(id, EventType::CleanUp, 0)?;
        self.instances.remove(&id);
        Ok(())
    }

    /// True for a live instance id, or for an object with a live instance
    /// of it or of a descendant.
    pub fn instance_exists(&self, target: i64) -> bool {
        match u32::try_from(target) {
            Ok(id) if id >= FIRST_INSTANCE_ID - 1 => self.instances.contains_key(&id),
            Ok(object) => self.instance_number(object as usize) > 0,
            Err(_) => false,
        }
    }

    /// Live instances of `object` or its descendants.
    pub fn instance_number(&self, object: usize) -> usize {
        self.instances
            .values()
            .filter(|i| i.object == object || self.game.is_ancestor(i.object, object))
            .count()
    }

    /// Runs `f` on a handle to an instance's variables. Nothing runs when
    /// the instance is gone.
    fn with_instance<R>(
        &mut self,
        id: u32,
        f: impl FnOnce(&mut Self, &mut Domain) -> Result<R, RuntimeError>,
    ) -> Result<Option<R>, RuntimeError> {
        let Some(instance) = self.instances.get(&id) else {
            return Ok(None);
        };
        let mut domain = instance.domain.share();
        f(self, &mut domain).map(Some)
    }

    /// Runs the handler for an event on an instance, inherited from the
    /// nearest ancestor when the object has none. The handler always runs
    /// in the instance's own variables, whoever triggered it.
    pub fn run_event(
        &mut self,
        id: u32,
        event: EventType,
        subtype: u32,
    ) -> Result<(), RuntimeError> {
        let object = self
            .instances
            .get(&id)
            .ok_or(RuntimeError::UnknownInstance { id: id.into() })?
            .object;
        let game = Rc::clone(&self.game);
        match game.find_event(object, event.index(), subtype) {
            Some((owner, handler)) => {
                let context = EventContext {
                    instance: id,
                    owner,
                    event,
                    subtype,
                };
                self.run_handler(context, &handler.actions)
            }
            None => Ok(()),
        }
    }

    /// Runs the parent's handler for the event currently running.
    pub fn event_inherited(&mut self) -> Result<(), RuntimeError> {
        let Some(current) = self.events.last().copied() else {
            return Ok(());
        };
        let game = Rc::clone(&self.game);
        let Some(parent) = game.objects.get(current.owner).and_then(|o| o.parent) else {
            return Ok(());
        };
        match game.find_event(parent, current.event.index(), current.subtype) {
            Some((owner, handler)) => {
                let context = EventContext { owner, ..current };
                self.run_handler(context, &handler.actions)
            }
            None => Ok(()),
        }
    }

    fn run_handler(&mut self, context: EventContext, actions: &[usize]) -> Result<(), RuntimeError> {
        self.events.push(context);
        let result = self
            .with_instance(context.instance, |session, domain| {
                session.run_actions(actions, domain)
            })
            .map(|_| ());
        self.events.pop();
        result
    }

    fn run_actions(&mut self, actions: &[usize], domain: &mut Domain) -> Result<(), RuntimeError> {
        for &code in actions {
            self.run_code_index(code, domain)?;
        }
        Ok(())
    }

    /// Requests a room change at the end of the current frame.
    pub fn goto_room(&mut self, index: usize) -> Result<(), RuntimeError> {
        if index >= self.game.rooms.len() {
            return Err(RuntimeError::UnknownRoom {
                index: index as i64,
            });
        }
        self.pending_room = Some(index);
        Ok(())
    }

    /// Enters the first room of the room order.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        let first = self.game.general.room_order.first().copied().unwrap_or(0);
        self.enter_room(first)
    }

    /// Leaves the current room and builds `index`: non-persistent
    /// instances are removed, placed instances are created, then the room
    /// creation code runs.
    pub fn enter_room(&mut self, index: usize) -> Result<(), RuntimeError> {
        let game = Rc::clone(&self.game);
        let room = game.rooms.get(index).ok_or(RuntimeError::UnknownRoom {
            index: index as i64,
        })?;
        info!(room = %room.name, index, "entering room");

        self.instances.retain(|_, instance| instance.persistent);
        self.room = Some(index);
        self.pending_room = None;

        for placed in &room.instances {
            let depth = game.objects.get(placed.object).map_or(0, |o| o.depth);
            let id = self.create_instance(
                f64::from(placed.x),
                f64::from(placed.y),
                f64::from(depth),
                placed.object,
            )?;
            self.with_instance(id, |session, domain| {
                if let Some(code) = placed.pre_create_code {
                    session.run_code_index(code, domain)?;
                }
                session.run_event(id, EventType::PreCreate, 0)?;
                session.run_event(id, EventType::Create, 0)?;
                if let Some(code) = placed.creation_code {
                    session.run_code_index(code, domain)?;
                }
                Ok(())
            })?;
        }

        if let Some(code) = room.creation_code {
            self.run_code_index(code, &mut Domain::new())?;
        }
        Ok(())
    }

    /// Runs one frame: begin step, step, end step and draw for every
    /// instance, then any requested room change.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        self.renderer.begin_frame();
        let result = self.run_frame_events();
        self.renderer.end_frame();
        self.platform.end_frame();
        self.frames += 1;
        result?;

        if let Some(room) = self.pending_room.take() {
            self.enter_room(room)?;
        }
        Ok(())
    }

    fn run_frame_events(&mut self) -> Result<(), RuntimeError> {
        let phases = [
            (EventType::Step, STEP_BEGIN),
            (EventType::Step, STEP_NORMAL),
            (EventType::Step, STEP_END),
            (EventType::Draw, 0),
        ];
        for (event, subtype) in phases {
            let ids: Vec<u32> = self.instances.keys().copied().collect();
            for id in ids {
                // Earlier handlers this frame may have destroyed it.
                if self.instances.contains_key(&id) {
                    self.run_event(id, event, subtype)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn parameter(&self, index: usize) -> Option<&str> {
        self.config.parameters.get(index).map(String::as_str)
    }
}
