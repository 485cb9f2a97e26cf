/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

// Named shortcuts on `Client` for each resource type: a request and a model.
macro_rules! resource_constructors {
    ( $( $kind:ident => $req:ident, $model:ident );* $(;)? ) => {
        impl Client {
            $(
                #[doc = concat!("Request for `", stringify!($req), "` resources")]
                pub fn $req(&self) -> TypedRequest {
                    self.resource(ResourceType::$kind)
                }

                #[doc = concat!("List model of `", stringify!($req), "` resources")]
                pub fn $model(&self) -> ListModel {
                    self.model(ResourceType::$kind)
                }
            )*
        }
    };
}

pub(crate) use resource_constructors;
