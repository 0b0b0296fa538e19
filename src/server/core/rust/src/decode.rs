/* src/server/core/rust/src/decode.rs */

use serde_json::{Map, Value};

use crate::errors::Error;
use crate::page::Page;
use crate::response::ResponseContext;

/// How a backend payload is read into the response context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
  /// A single JSON object, stored in `data`
  Object,
  /// A JSON array of objects, stored in `array`
  Array,
}

impl Decoder {
  pub fn for_page(page: &Page) -> Self {
    if page.is_array { Self::Array } else { Self::Object }
  }

  /// Decode `body` into `ctx`. On failure `ctx` is left untouched.
  pub fn decode(self, body: &[u8], ctx: &mut ResponseContext) -> Result<(), Error> {
    match self {
      Self::Object => {
        let data: Map<String, Value> = serde_json::from_slice(body)?;
        ctx.data = Some(data);
      }
      Self::Array => {
        let array: Vec<Map<String, Value>> = serde_json::from_slice(body)?;
        ctx.array = Some(array);
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn object_mode() {
    let mut ctx = ResponseContext::default();
    Decoder::Object.decode(br#"{"a":"b"}"#, &mut ctx).unwrap();
    assert_eq!(ctx.data.as_ref().unwrap()["a"], "b");
    assert!(ctx.array.is_none());
  }

  #[test]
  fn array_mode() {
    let mut ctx = ResponseContext::default();
    Decoder::Array.decode(br#"[{"a":"b"}]"#, &mut ctx).unwrap();
    let array = ctx.array.as_ref().unwrap();
    assert_eq!(array.len(), 1);
    assert_eq!(array[0]["a"], "b");
    assert!(ctx.data.is_none());
  }

  #[test]
  fn large_numbers_keep_precision() {
    let mut ctx = ResponseContext::default();
    Decoder::Object.decode(br#"{"id": 9007199254740993123}"#, &mut ctx).unwrap();
    assert_eq!(ctx.data.unwrap()["id"].to_string(), "9007199254740993123");
  }

  #[test]
  fn malformed_body_leaves_context_untouched() {
    let mut ctx = ResponseContext::default();
    let err = Decoder::Object.decode(b"{\"a\":", &mut ctx).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert!(ctx.data.is_none());

    let err = Decoder::Array.decode(br#"{"a":"b"}"#, &mut ctx).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert!(ctx.array.is_none());
  }

  #[test]
  fn decoder_follows_page_mode() {
    let page = Page { is_array: true, ..Page::default() };
    assert_eq!(Decoder::for_page(&page), Decoder::Array);
    assert_eq!(Decoder::for_page(&Page::default()), Decoder::Object);
  }
}
