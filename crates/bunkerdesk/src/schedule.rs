//! Call schedule planning.
//!
//! Operations work on a slot list in vector order and keep `position`
//! equal to the index. Times live on a grid of evenly spaced slots; a
//! schedule never crosses midnight.

use std::cmp::Ordering;

use chrono::{Duration, NaiveTime};

use crate::error::{Error, Result};
use crate::model::{Contact, ScheduleSlot};

/// Evenly spaced slot times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    /// Time of the first slot.
    pub start: NaiveTime,
    /// Gap between consecutive slots.
    pub interval: Duration,
}

impl Grid {
    /// A grid starting at `start` with `minutes` between slots.
    #[must_use]
    pub fn new(start: NaiveTime, minutes: u32) -> Self {
        Self {
            start,
            interval: Duration::minutes(i64::from(minutes)),
        }
    }

    /// Time of the slot at `index`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the slot would fall on the next day.
    pub fn time_at(&self, index: usize) -> Result<NaiveTime> {
        let steps = i32::try_from(index)
            .map_err(|_| Error::validation("schedule has too many slots"))?;
        let offset = self
            .interval
            .checked_mul(steps)
            .ok_or_else(|| Error::validation("schedule has too many slots"))?;
        shift(self.start, offset)
    }
}

fn shift(time: NaiveTime, by: Duration) -> Result<NaiveTime> {
    let (shifted, wrapped) = time.overflowing_add_signed(by);
    if wrapped != 0 {
        return Err(Error::validation(format!(
            "slot at {} moved by {} minutes crosses midnight",
            time.format("%H:%M"),
            by.num_minutes()
        )));
    }
    Ok(shifted)
}

fn check_index(slots: &[ScheduleSlot], index: usize) -> Result<()> {
    if index >= slots.len() {
        return Err(Error::validation(format!(
            "slot {index} out of range (schedule has {} slots)",
            slots.len()
        )));
    }
    Ok(())
}

fn renumber(slots: &mut [ScheduleSlot]) {
    for (position, slot) in slots.iter_mut().enumerate() {
        slot.position = u32::try_from(position).unwrap_or(u32::MAX);
    }
}

fn calling_order(a: &Contact, b: &Contact) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| match (a.last_contacted_at, b.last_contacted_at) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(&y),
        })
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

/// Build up to `count` slots for the best contacts to call.
///
/// Highest priority first, then whoever has gone longest without contact.
/// Dead and unsaved contacts are skipped.
///
/// # Errors
///
/// Returns a validation error if the slots would run past midnight.
pub fn generate(contacts: &[Contact], grid: &Grid, count: usize) -> Result<Vec<ScheduleSlot>> {
    let mut candidates: Vec<&Contact> = contacts
        .iter()
        .filter(|contact| contact.id.is_some() && !contact.status.dead)
        .collect();
    candidates.sort_by(|a, b| calling_order(a, b));

    let mut slots = Vec::with_capacity(count.min(candidates.len()));
    for (index, contact) in candidates.into_iter().take(count).enumerate() {
        let Some(contact_id) = contact.id else {
            continue;
        };
        let position = u32::try_from(index).unwrap_or(u32::MAX);
        slots.push(ScheduleSlot::new(contact_id, position, grid.time_at(index)?));
    }
    Ok(slots)
}

/// Insert a call for `contact_id` at `index` (clamped to the end).
///
/// The new slot takes the displaced slot's time and every later slot moves
/// one interval later. Appending uses the last time plus one interval; an
/// empty schedule starts at the grid start.
///
/// # Errors
///
/// Returns a validation error if a shifted slot would cross midnight. The
/// slots are unchanged in that case.
pub fn insert_at(
    slots: &mut Vec<ScheduleSlot>,
    index: usize,
    contact_id: i64,
    grid: &Grid,
) -> Result<()> {
    let index = index.min(slots.len());
    let time = match (slots.get(index), slots.last()) {
        (Some(displaced), _) => displaced.time,
        (None, Some(last)) => shift(last.time, grid.interval)?,
        (None, None) => grid.start,
    };
    let shifted = slots[index..]
        .iter()
        .map(|slot| shift(slot.time, grid.interval))
        .collect::<Result<Vec<_>>>()?;

    for (slot, new_time) in slots[index..].iter_mut().zip(shifted) {
        slot.time = new_time;
    }
    slots.insert(index, ScheduleSlot::new(contact_id, 0, time));
    renumber(slots);
    Ok(())
}

/// Move the slot at `from` to `to`.
///
/// Times stay with positions: the contact (and its completion) moves, the
/// time grid does not.
///
/// # Errors
///
/// Returns a validation error if either index is out of range.
pub fn move_slot(slots: &mut Vec<ScheduleSlot>, from: usize, to: usize) -> Result<()> {
    check_index(slots, from)?;
    check_index(slots, to)?;
    if from == to {
        return Ok(());
    }
    let times: Vec<NaiveTime> = slots.iter().map(|slot| slot.time).collect();
    let slot = slots.remove(from);
    slots.insert(to, slot);
    for (slot, time) in slots.iter_mut().zip(times) {
        slot.time = time;
    }
    renumber(slots);
    Ok(())
}

/// Move the slot at `index` one place up (earlier) or down (later).
///
/// # Errors
///
/// Returns a validation error if `index` or its neighbour is out of range.
pub fn swap_adjacent(slots: &mut Vec<ScheduleSlot>, index: usize, up: bool) -> Result<()> {
    let target = if up {
        index
            .checked_sub(1)
            .ok_or_else(|| Error::validation("first slot cannot move up"))?
    } else {
        index
            .checked_add(1)
            .ok_or_else(|| Error::validation("last slot cannot move down"))?
    };
    move_slot(slots, index, target)
}

/// Remove and return the slot at `index`. Later slots keep their times.
///
/// # Errors
///
/// Returns a validation error if `index` is out of range.
pub fn remove_at(slots: &mut Vec<ScheduleSlot>, index: usize) -> Result<ScheduleSlot> {
    check_index(slots, index)?;
    let removed = slots.remove(index);
    renumber(slots);
    Ok(removed)
}

/// Rewrite every time onto `grid`.
///
/// # Errors
///
/// Returns a validation error if the slots would run past midnight.
pub fn retime(slots: &mut [ScheduleSlot], grid: &Grid) -> Result<()> {
    let times = (0..slots.len())
        .map(|index| grid.time_at(index))
        .collect::<Result<Vec<_>>>()?;
    for (slot, time) in slots.iter_mut().zip(times) {
        slot.time = time;
    }
    renumber(slots);
    Ok(())
}

/// First slot not yet done.
#[must_use]
pub fn next_pending(slots: &[ScheduleSlot]) -> Option<&ScheduleSlot> {
    slots.iter().find(|slot| !slot.completed)
}

/// Positions match indices.
#[must_use]
pub fn is_well_formed(slots: &[ScheduleSlot]) -> bool {
    slots
        .iter()
        .enumerate()
        .all(|(index, slot)| usize::try_from(slot.position).is_ok_and(|p| p == index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusFlag;
    use chrono::{TimeZone, Utc};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn grid() -> Grid {
        Grid::new(t(9, 0), 15)
    }

    fn slots(contacts: &[i64]) -> Vec<ScheduleSlot> {
        let grid = grid();
        contacts
            .iter()
            .enumerate()
            .map(|(i, id)| ScheduleSlot::new(*id, i as u32, grid.time_at(i).unwrap()))
            .collect()
    }

    fn contacts_of(slots: &[ScheduleSlot]) -> Vec<i64> {
        slots.iter().map(|s| s.contact_id).collect()
    }

    fn times_of(slots: &[ScheduleSlot]) -> Vec<NaiveTime> {
        slots.iter().map(|s| s.time).collect()
    }

    fn contact(id: i64, name: &str, priority: u8) -> Contact {
        let mut contact = Contact::new(name);
        contact.id = Some(id);
        contact.priority = priority;
        contact
    }

    #[test]
    fn test_generate_orders_and_skips_dead() {
        let mut dead = contact(4, "Dee", 5);
        dead.status.set(StatusFlag::Dead, true);
        let mut recent = contact(2, "Bo", 3);
        recent.last_contacted_at = Some(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap());
        let mut stale = contact(3, "Cy", 3);
        stale.last_contacted_at = Some(Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap());
        let never = contact(5, "Eve", 3);
        let unsaved = Contact::new("Nobody");

        let contacts = vec![contact(1, "Ana", 1), recent, stale, dead, never, unsaved];
        let generated = generate(&contacts, &grid(), 10).unwrap();

        assert_eq!(contacts_of(&generated), vec![5, 3, 2, 1]);
        assert_eq!(times_of(&generated), vec![t(9, 0), t(9, 15), t(9, 30), t(9, 45)]);
        assert!(is_well_formed(&generated));
    }

    #[test]
    fn test_generate_respects_count() {
        let contacts: Vec<Contact> = (1..=5).map(|i| contact(i, "X", 1)).collect();
        assert_eq!(generate(&contacts, &grid(), 2).unwrap().len(), 2);
    }

    #[test]
    fn test_generate_past_midnight_fails() {
        let late = Grid::new(t(23, 30), 20);
        let contacts: Vec<Contact> = (1..=3).map(|i| contact(i, "X", 1)).collect();
        assert!(generate(&contacts, &late, 3).unwrap_err().is_validation());
    }

    #[test]
    fn test_insert_middle_shifts_later_slots() {
        let mut s = slots(&[1, 2, 3]);
        insert_at(&mut s, 1, 9, &grid()).unwrap();
        assert_eq!(contacts_of(&s), vec![1, 9, 2, 3]);
        assert_eq!(times_of(&s), vec![t(9, 0), t(9, 15), t(9, 30), t(9, 45)]);
        assert!(is_well_formed(&s));
    }

    #[test]
    fn test_insert_clamps_to_end() {
        let mut s = slots(&[1, 2]);
        insert_at(&mut s, 99, 9, &grid()).unwrap();
        assert_eq!(contacts_of(&s), vec![1, 2, 9]);
        assert_eq!(s[2].time, t(9, 30));
        assert_eq!(s[2].position, 2);
    }

    #[test]
    fn test_insert_into_empty() {
        let mut s = Vec::new();
        insert_at(&mut s, 0, 7, &grid()).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].time, t(9, 0));
    }

    #[test]
    fn test_insert_past_midnight_leaves_slots() {
        let mut s = vec![ScheduleSlot::new(1, 0, t(23, 50))];
        let before = s.clone();
        assert!(insert_at(&mut s, 0, 2, &grid()).unwrap_err().is_validation());
        assert_eq!(s, before);
    }

    #[test]
    fn test_move_keeps_time_grid() {
        let mut s = slots(&[1, 2, 3, 4]);
        s[0].completed = true;
        move_slot(&mut s, 0, 2).unwrap();
        assert_eq!(contacts_of(&s), vec![2, 3, 1, 4]);
        assert_eq!(times_of(&s), vec![t(9, 0), t(9, 15), t(9, 30), t(9, 45)]);
        assert!(s[2].completed);
        assert!(is_well_formed(&s));
    }

    #[test]
    fn test_move_out_of_range() {
        let mut s = slots(&[1, 2]);
        assert!(move_slot(&mut s, 0, 2).unwrap_err().is_validation());
        assert!(move_slot(&mut s, 5, 0).unwrap_err().is_validation());
    }

    #[test]
    fn test_swap_adjacent() {
        let mut s = slots(&[1, 2, 3]);
        swap_adjacent(&mut s, 2, true).unwrap();
        assert_eq!(contacts_of(&s), vec![1, 3, 2]);
        swap_adjacent(&mut s, 0, false).unwrap();
        assert_eq!(contacts_of(&s), vec![3, 1, 2]);
        assert!(swap_adjacent(&mut s, 0, true).is_err());
        assert!(swap_adjacent(&mut s, 2, false).is_err());
    }

    #[test]
    fn test_swap_adjacent_rejects_huge_index() {
        let mut s = slots(&[1, 2]);
        let err = swap_adjacent(&mut s, usize::MAX, false).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(contacts_of(&s), vec![1, 2]);
    }

    #[test]
    fn test_remove_keeps_later_times() {
        let mut s = slots(&[1, 2, 3]);
        let removed = remove_at(&mut s, 0).unwrap();
        assert_eq!(removed.contact_id, 1);
        assert_eq!(contacts_of(&s), vec![2, 3]);
        assert_eq!(times_of(&s), vec![t(9, 15), t(9, 30)]);
        assert!(is_well_formed(&s));
        assert!(remove_at(&mut s, 2).unwrap_err().is_validation());
    }

    #[test]
    fn test_retime() {
        let mut s = slots(&[1, 2, 3]);
        remove_at(&mut s, 0).unwrap();
        retime(&mut s, &Grid::new(t(14, 0), 30)).unwrap();
        assert_eq!(times_of(&s), vec![t(14, 0), t(14, 30)]);
    }

    #[test]
    fn test_next_pending() {
        let mut s = slots(&[1, 2]);
        assert_eq!(next_pending(&s).unwrap().contact_id, 1);
        s[0].completed = true;
        assert_eq!(next_pending(&s).unwrap().contact_id, 2);
        s[1].completed = true;
        assert!(next_pending(&s).is_none());
    }

    #[test]
    fn test_is_well_formed_detects_gap() {
        let mut s = slots(&[1, 2]);
        s[1].position = 5;
        assert!(!is_well_formed(&s));
    }
}
