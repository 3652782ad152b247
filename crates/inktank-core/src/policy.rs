//! Creation policies shared by every parent kind.
//!
//! Attribution: drafts carry no author. [`SubDocument::from_draft`] receives
//! the authenticated caller's id and that is the only value an `author` field
//! is ever set from.
//!
//! Placement: comments and ratings append; a bio replaces the first slot so a
//! parent never ends up with two.

use crate::subdoc::{Collection, SubDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
  /// Add after the existing items.
  Append,
  /// Overwrite index 0, inserting if the collection is empty.
  ReplaceFirst,
}

/// Put a freshly built item where its kind's placement says.
pub fn place<K: SubDocument>(collection: &mut Collection<K>, item: K) {
  match K::PLACEMENT {
    Placement::Append => collection.push(item),
    Placement::ReplaceFirst => collection.replace_first(item),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::subdoc::{Bio, BioDraft, Comment, CommentDraft};

  fn bio(location: &str) -> Bio {
    Bio::from_draft(
      BioDraft {
        location:      location.into(),
        description:   "d".into(),
        review:        None,
        review_author: None,
        portfolio:     None,
        social:        vec![],
      },
      Uuid::nil(),
      Utc::now(),
    )
  }

  #[test]
  fn bios_replace_instead_of_appending() {
    let mut coll = Collection::default();
    for location in ["X", "Y", "Z"] {
      place(&mut coll, bio(location));
    }
    assert_eq!(coll.len(), 1);
    assert_eq!(coll.as_slice()[0].location, "Z");
  }

  #[test]
  fn comments_append() {
    let mut coll = Collection::default();
    for text in ["a", "b"] {
      place(
        &mut coll,
        Comment::from_draft(CommentDraft { text: text.into() }, Uuid::nil(), Utc::now()),
      );
    }
    assert_eq!(coll.len(), 2);
    assert_eq!(coll.as_slice()[1].text, "b");
  }
}
