//! Generated Firestore v1 protobuf types.
//!
//! The module nesting here mirrors the `.proto` package names exactly
//! (`google.type`, `google.firestore.v1`) so that the `super::` paths prost
//! emits for cross-package references (`Value::geo_point_value` pointing at
//! `google.type.LatLng`) resolve without any post-processing.
#![allow(clippy::all)]

pub mod google {
    pub mod r#type {
        tonic::include_proto!("google.type");
    }

    pub mod firestore {
        pub mod v1 {
            tonic::include_proto!("google.firestore.v1");
        }
    }
}

pub use google::firestore::v1::*;
