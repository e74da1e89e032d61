//! Environment for local bindings
//!
//! Local variables live in frames allocated from an arena. A frame is a
//! fixed-size slot array plus a parent link, and analysis has already turned
//! every local reference into a `(depth, slot)` pair, so lookups never
//! touch names.
//!
//! Frames are addressed by generational handles. Frames that no closure can
//! see are released as soon as their scope exits. Frames captured by a
//! closure stay alive until a collection pass finds them unreachable.

use crate::error::{Error, Result};
use crate::language::Value;

/// Handle to a frame in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    index: u32,
    generation: u32,
}

/// The innermost frame of a lexical chain, `None` at top level
pub type Env = Option<FrameId>;

struct Frame {
    values: Vec<Value>,
    parent: Env,
    generation: u32,
    /// Reachable from a closure; only a collection may free it
    captured: bool,
    live: bool,
    marked: bool,
}

#[derive(Default)]
pub struct Environment {
    frames: Vec<Frame>,
    free: Vec<u32>,
    live: usize,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Allocate a frame holding `values`, child of `parent`
    pub fn push(&mut self, parent: Env, values: Vec<Value>) -> FrameId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let frame = &mut self.frames[index as usize];
            frame.values = values;
            frame.parent = parent;
            frame.captured = false;
            frame.live = true;
            frame.marked = false;
            return FrameId {
                index,
                generation: frame.generation,
            };
        }
        self.frames.push(Frame {
            values,
            parent,
            generation: 0,
            captured: false,
            live: true,
            marked: false,
        });
        FrameId {
            index: (self.frames.len() - 1) as u32,
            generation: 0,
        }
    }

    fn frame(&self, id: FrameId) -> Result<&Frame> {
        match self.frames.get(id.index as usize) {
            Some(frame) if frame.live && frame.generation == id.generation => Ok(frame),
            _ => Err(Error::internal(format!("stale frame {}", id.index))),
        }
    }

    fn frame_mut(&mut self, id: FrameId) -> Result<&mut Frame> {
        match self.frames.get_mut(id.index as usize) {
            Some(frame) if frame.live && frame.generation == id.generation => Ok(frame),
            _ => Err(Error::internal(format!("stale frame {}", id.index))),
        }
    }

    fn ancestor(&self, env: Env, depth: usize) -> Result<FrameId> {
        let mut current = env;
        for _ in 0..depth {
            current = match current {
                Some(id) => self.frame(id)?.parent,
                None => None,
            };
        }
        current.ok_or_else(|| Error::internal("local reference outside any frame"))
    }

    /// Read `slot` of the frame `depth` links up from `env`
    pub fn lookup(&self, env: Env, depth: usize, slot: usize) -> Result<Value> {
        let id = self.ancestor(env, depth)?;
        self.frame(id)?
            .values
            .get(slot)
            .cloned()
            .ok_or_else(|| Error::internal(format!("slot {slot} out of range")))
    }

    pub fn set(&mut self, id: FrameId, slot: usize, value: Value) -> Result<()> {
        let frame = self.frame_mut(id)?;
        match frame.values.get_mut(slot) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::internal(format!("slot {slot} out of range"))),
        }
    }

    /// Overwrite consecutive slots starting at `offset`, for `recur`
    pub fn rebind(&mut self, id: FrameId, offset: usize, values: Vec<Value>) -> Result<()> {
        for (i, value) in values.into_iter().enumerate() {
            self.set(id, offset + i, value)?;
        }
        Ok(())
    }

    /// Copy of the slots of a frame
    pub fn values(&self, id: FrameId) -> Result<Vec<Value>> {
        Ok(self.frame(id)?.values.clone())
    }

    /// Mark `env` and its ancestors as captured by a closure
    pub fn capture(&mut self, env: Env) {
        let mut current = env;
        while let Some(id) = current {
            match self.frames.get_mut(id.index as usize) {
                Some(frame) if frame.live && frame.generation == id.generation => {
                    if frame.captured {
                        break;
                    }
                    frame.captured = true;
                    current = frame.parent;
                }
                _ => break,
            }
        }
    }

    pub fn is_captured(&self, id: FrameId) -> bool {
        self.frame(id).is_ok_and(|frame| frame.captured)
    }

    /// Free a frame on scope exit unless a closure captured it
    pub fn release(&mut self, id: FrameId) {
        let captured = match self.frame(id) {
            Ok(frame) => frame.captured,
            Err(_) => return,
        };
        if !captured {
            self.free_frame(id.index);
        }
    }

    fn free_frame(&mut self, index: u32) {
        let frame = &mut self.frames[index as usize];
        frame.values = Vec::new();
        frame.parent = None;
        frame.live = false;
        frame.captured = false;
        frame.generation = frame.generation.wrapping_add(1);
        self.free.push(index);
        self.live -= 1;
    }

    /// Number of frames currently allocated
    pub fn live_frames(&self) -> usize {
        self.live
    }

    /// Mark a frame reachable. Returns the values the collector still has to
    /// trace, or `None` if the frame was already marked or is stale.
    pub fn mark(&mut self, id: FrameId) -> Option<(Vec<Value>, Env)> {
        match self.frames.get_mut(id.index as usize) {
            Some(frame) if frame.live && frame.generation == id.generation && !frame.marked => {
                frame.marked = true;
                Some((frame.values.clone(), frame.parent))
            }
            _ => None,
        }
    }

    /// Free every unmarked frame and clear the marks. Returns the number of
    /// frames freed.
    pub fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for index in 0..self.frames.len() {
            let frame = &mut self.frames[index];
            if !frame.live {
                continue;
            }
            if frame.marked {
                frame.marked = false;
            } else {
                self.free_frame(index as u32);
                freed += 1;
            }
        }
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_depth() {
        let mut env = Environment::new();
        let outer = env.push(None, vec![Value::int(1), Value::int(2)]);
        let inner = env.push(Some(outer), vec![Value::int(3)]);
        assert_eq!(env.lookup(Some(inner), 0, 0).unwrap(), Value::int(3));
        assert_eq!(env.lookup(Some(inner), 1, 1).unwrap(), Value::int(2));
        assert!(env.lookup(Some(inner), 2, 0).is_err());
    }

    #[test]
    fn test_release_reuses_slot_with_new_generation() {
        let mut env = Environment::new();
        let a = env.push(None, vec![Value::int(1)]);
        env.release(a);
        assert_eq!(env.live_frames(), 0);
        let b = env.push(None, vec![Value::int(2)]);
        assert_ne!(a, b);
        assert!(matches!(env.lookup(Some(a), 0, 0), Err(Error::Internal(_))));
        assert_eq!(env.lookup(Some(b), 0, 0).unwrap(), Value::int(2));
    }

    #[test]
    fn test_captured_frames_survive_release() {
        let mut env = Environment::new();
        let outer = env.push(None, vec![Value::int(1)]);
        let inner = env.push(Some(outer), vec![]);
        env.capture(Some(inner));
        env.release(inner);
        env.release(outer);
        assert_eq!(env.live_frames(), 2);
        assert!(env.is_captured(outer));
    }

    #[test]
    fn test_sweep_frees_unmarked() {
        let mut env = Environment::new();
        let kept = env.push(None, vec![Value::int(1)]);
        let dropped = env.push(None, vec![Value::int(2)]);
        env.capture(Some(kept));
        env.capture(Some(dropped));
        assert!(env.mark(kept).is_some());
        assert!(env.mark(kept).is_none());
        assert_eq!(env.sweep(), 1);
        assert_eq!(env.live_frames(), 1);
        assert_eq!(env.lookup(Some(kept), 0, 0).unwrap(), Value::int(1));
    }

    #[test]
    fn test_rebind() {
        let mut env = Environment::new();
        let id = env.push(None, vec![Value::Nil, Value::int(0), Value::int(0)]);
        env.rebind(id, 1, vec![Value::int(5), Value::int(6)]).unwrap();
        assert_eq!(
            env.values(id).unwrap(),
            vec![Value::Nil, Value::int(5), Value::int(6)]
        );
    }
}
