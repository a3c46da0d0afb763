#![allow(missing_docs)]

pub(crate) mod fakes;
pub(crate) mod http;

pub(crate) use fakes::{FailingRecordStore, FakeAi, FakeFetcher, TestRecordStore};
pub(crate) use http::{assert_content_type, get_header, parse_json, spawn_test_server};
