//! Sequence events and their application.

use crate::error::{Result, SourceError};
use crate::types::{Collection, Element};
use serde::{Deserialize, Serialize};

use super::draft::Draft;

/// One incremental change to an ordered sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event<T> {
    /// Values appended at the end.
    Append { values: Vec<T> },

    /// Exactly one trailing element removed.
    RemoveLast,

    /// Values inserted at the start.
    Prepend { values: Vec<T> },

    /// Exactly one leading element removed.
    RemoveFirst,

    /// `delete` elements removed at `index`, then `insert` placed there.
    Splice {
        index: usize,
        delete: usize,
        insert: Vec<T>,
    },

    /// Element at `index` replaced in place.
    Assign { index: usize, value: T },

    /// Sub-events applied strictly in order.
    Composite { events: Vec<Event<T>> },
}

/// Normalized view of a single (non-composite) event, positioned against
/// the sequence it applies to.
#[derive(Debug, PartialEq, Eq)]
pub enum Change<'a, T> {
    Splice {
        index: usize,
        delete: usize,
        insert: &'a [T],
    },
    Assign {
        index: usize,
        value: &'a T,
    },
}

impl<T> Event<T> {
    /// Length of the sequence after applying this event to one of `len`.
    pub fn len_after(&self, len: usize) -> Result<usize> {
        match self {
            Event::Append { values } | Event::Prepend { values } => Ok(len + values.len()),
            Event::RemoveLast | Event::RemoveFirst => {
                if len == 0 {
                    return Err(SourceError::IndexOutOfBounds { index: 0, len });
                }
                Ok(len - 1)
            }
            Event::Splice {
                index,
                delete,
                insert,
            } => {
                check_range(*index, *delete, len)?;
                Ok(len - delete + insert.len())
            }
            Event::Assign { index, .. } => {
                check_index(*index, len)?;
                Ok(len)
            }
            Event::Composite { events } => events.iter().try_fold(len, |len, e| e.len_after(len)),
        }
    }

    /// Flatten into positioned changes, validating each against the running
    /// length that starts at `len`.
    pub fn changes(&self, len: usize) -> Result<Vec<Change<'_, T>>> {
        let mut out = Vec::new();
        self.collect_changes(len, &mut out)?;
        Ok(out)
    }

    fn collect_changes<'a>(&'a self, len: usize, out: &mut Vec<Change<'a, T>>) -> Result<usize> {
        match self {
            Event::Append { values } => {
                out.push(Change::Splice {
                    index: len,
                    delete: 0,
                    insert: values,
                });
                Ok(len + values.len())
            }
            Event::Prepend { values } => {
                out.push(Change::Splice {
                    index: 0,
                    delete: 0,
                    insert: values,
                });
                Ok(len + values.len())
            }
            Event::RemoveLast => {
                if len == 0 {
                    return Err(SourceError::IndexOutOfBounds { index: 0, len });
                }
                out.push(Change::Splice {
                    index: len - 1,
                    delete: 1,
                    insert: &[],
                });
                Ok(len - 1)
            }
            Event::RemoveFirst => {
                if len == 0 {
                    return Err(SourceError::IndexOutOfBounds { index: 0, len });
                }
                out.push(Change::Splice {
                    index: 0,
                    delete: 1,
                    insert: &[],
                });
                Ok(len - 1)
            }
            Event::Splice {
                index,
                delete,
                insert,
            } => {
                check_range(*index, *delete, len)?;
                out.push(Change::Splice {
                    index: *index,
                    delete: *delete,
                    insert,
                });
                Ok(len - delete + insert.len())
            }
            Event::Assign { index, value } => {
                check_index(*index, len)?;
                out.push(Change::Assign {
                    index: *index,
                    value,
                });
                Ok(len)
            }
            Event::Composite { events } => {
                let mut len = len;
                for event in events {
                    len = event.collect_changes(len, out)?;
                }
                Ok(len)
            }
        }
    }

    /// Every value this event introduces, in order.
    pub fn inserted(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_inserted(&mut out);
        out
    }

    fn collect_inserted<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Event::Append { values } | Event::Prepend { values } => out.extend(values.iter()),
            Event::Splice { insert, .. } => out.extend(insert.iter()),
            Event::Assign { value, .. } => out.push(value),
            Event::RemoveLast | Event::RemoveFirst => {}
            Event::Composite { events } => {
                for event in events {
                    event.collect_inserted(out);
                }
            }
        }
    }

    /// Same structure with every payload value transformed.
    pub fn map<U>(&self, f: &dyn Fn(&T) -> U) -> Event<U> {
        match self {
            Event::Append { values } => Event::Append {
                values: values.iter().map(f).collect(),
            },
            Event::RemoveLast => Event::RemoveLast,
            Event::Prepend { values } => Event::Prepend {
                values: values.iter().map(f).collect(),
            },
            Event::RemoveFirst => Event::RemoveFirst,
            Event::Splice {
                index,
                delete,
                insert,
            } => Event::Splice {
                index: *index,
                delete: *delete,
                insert: insert.iter().map(f).collect(),
            },
            Event::Assign { index, value } => Event::Assign {
                index: *index,
                value: f(value),
            },
            Event::Composite { events } => Event::Composite {
                events: events.iter().map(|e| e.map(f)).collect(),
            },
        }
    }
}

impl<T: Clone> Event<T> {
    /// Apply this event to `items`.
    ///
    /// Composite sub-events are applied in order; an invalid sub-event stops
    /// the pass and reports the violation.
    pub fn apply(&self, items: &mut Vec<T>) -> Result<()> {
        match self {
            Event::Append { values } => {
                items.extend(values.iter().cloned());
            }
            Event::RemoveLast => {
                if items.pop().is_none() {
                    return Err(SourceError::IndexOutOfBounds { index: 0, len: 0 });
                }
            }
            Event::Prepend { values } => {
                items.splice(0..0, values.iter().cloned());
            }
            Event::RemoveFirst => {
                if items.is_empty() {
                    return Err(SourceError::IndexOutOfBounds { index: 0, len: 0 });
                }
                items.remove(0);
            }
            Event::Splice {
                index,
                delete,
                insert,
            } => {
                check_range(*index, *delete, items.len())?;
                items.splice(*index..*index + *delete, insert.iter().cloned());
            }
            Event::Assign { index, value } => {
                check_index(*index, items.len())?;
                items[*index] = value.clone();
            }
            Event::Composite { events } => {
                for event in events {
                    event.apply(items)?;
                }
            }
        }
        Ok(())
    }
}

impl<T: Element> Collection for Vec<T> {
    type Event = Event<T>;
    type Draft = Draft<T>;

    fn apply(&mut self, event: &Event<T>) -> Result<()> {
        event.apply(self)
    }

    fn draft(&self) -> Draft<T> {
        Draft::new(self.len())
    }
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(SourceError::IndexOutOfBounds { index, len });
    }
    Ok(())
}

/// Validate `index` and clamp `count` to the elements available after it.
pub(crate) fn clamp_range(index: usize, count: usize, len: usize) -> Result<usize> {
    if index > len {
        return Err(SourceError::IndexOutOfBounds { index, len });
    }
    Ok(count.min(len - index))
}

pub(crate) fn check_range(index: usize, count: usize, len: usize) -> Result<()> {
    if index > len {
        return Err(SourceError::IndexOutOfBounds { index, len });
    }
    if count > len - index {
        return Err(SourceError::RangeOutOfBounds { index, count, len });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_each_kind() {
        let mut items = vec![1, 2, 3];

        Event::Append { values: vec![4, 5] }.apply(&mut items).unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);

        Event::RemoveLast.apply(&mut items).unwrap();
        Event::Prepend { values: vec![0] }.apply(&mut items).unwrap();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);

        Event::RemoveFirst.apply(&mut items).unwrap();
        Event::Splice {
            index: 1,
            delete: 2,
            insert: vec![9],
        }
        .apply(&mut items)
        .unwrap();
        assert_eq!(items, vec![1, 9, 4]);

        Event::Assign { index: 2, value: 7 }.apply(&mut items).unwrap();
        assert_eq!(items, vec![1, 9, 7]);
    }

    #[test]
    fn test_composite_applies_in_order() {
        let mut items = vec!['a', 'b'];
        let event = Event::Composite {
            events: vec![
                Event::Append { values: vec!['c'] },
                // Index 2 only exists after the append.
                Event::Assign {
                    index: 2,
                    value: 'z',
                },
                Event::RemoveFirst,
            ],
        };
        event.apply(&mut items).unwrap();
        assert_eq!(items, vec!['b', 'z']);
        assert_eq!(event.len_after(2).unwrap(), 2);
    }

    #[test]
    fn test_apply_rejects_out_of_bounds() {
        let mut items = vec![1, 2, 3];
        let err = Event::Splice {
            index: 2,
            delete: 2,
            insert: vec![],
        }
        .apply(&mut items)
        .unwrap_err();
        assert_eq!(
            err,
            SourceError::RangeOutOfBounds {
                index: 2,
                count: 2,
                len: 3
            }
        );

        let err = Event::Assign { index: 3, value: 0 }.apply(&mut items).unwrap_err();
        assert_eq!(err, SourceError::IndexOutOfBounds { index: 3, len: 3 });

        let mut empty: Vec<i32> = Vec::new();
        assert!(Event::RemoveLast.apply(&mut empty).is_err());
        assert!(Event::RemoveFirst.apply(&mut empty).is_err());
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_changes_track_running_length() {
        let event = Event::Composite {
            events: vec![
                Event::Append { values: vec![1, 2] },
                Event::RemoveLast,
                Event::Assign { index: 0, value: 5 },
            ],
        };
        let changes = event.changes(3).unwrap();
        assert_eq!(
            changes,
            vec![
                Change::Splice {
                    index: 3,
                    delete: 0,
                    insert: &[1, 2][..],
                },
                Change::Splice {
                    index: 4,
                    delete: 1,
                    insert: &[][..],
                },
                Change::Assign {
                    index: 0,
                    value: &5,
                },
            ]
        );
    }

    #[test]
    fn test_map_preserves_structure() {
        let event = Event::Composite {
            events: vec![
                Event::Prepend { values: vec![1] },
                Event::Splice {
                    index: 1,
                    delete: 1,
                    insert: vec![2, 3],
                },
            ],
        };
        let mapped = event.map(&|x: &i32| x.to_string());
        assert_eq!(
            mapped,
            Event::Composite {
                events: vec![
                    Event::Prepend {
                        values: vec!["1".to_string()]
                    },
                    Event::Splice {
                        index: 1,
                        delete: 1,
                        insert: vec!["2".to_string(), "3".to_string()],
                    },
                ],
            }
        );
        assert_eq!(event.inserted(), vec![&1, &2, &3]);
    }

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(1, 10, 3), Ok(2));
        assert_eq!(clamp_range(3, 1, 3), Ok(0));
        assert_eq!(
            clamp_range(4, 0, 3),
            Err(SourceError::IndexOutOfBounds { index: 4, len: 3 })
        );
    }

    #[test]
    fn test_serialized_shape() {
        let event = Event::Splice {
            index: 1,
            delete: 0,
            insert: vec![4],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "splice", "index": 1, "delete": 0, "insert": [4]})
        );

        let back: Event<i32> = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);

        let json = serde_json::to_value(Event::<i32>::RemoveLast).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "remove_last"}));
    }
}
