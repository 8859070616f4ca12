//
//  scm-bitbucket
//  webhook/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Webhooks
//!
//! Both directions of the webhook boundary:
//!
//! - [`normalize`]: inbound — classify a provider delivery and extract the
//!   canonical event, or decide it is not interesting.
//! - [`register`]: outbound — idempotently ensure a hook pointing at a
//!   callback URL exists on a repository (find-or-create).

/// Inbound webhook classification and field extraction.
pub mod normalize;

/// Outbound find-or-create hook registration.
pub mod register;

pub use normalize::{
    EventAction, EventType, WebhookEvent, WEBHOOK_EVENT_HEADER, WEBHOOK_UUID_HEADER,
};
pub use register::{WebhookRegistrar, DEFAULT_WEBHOOK_EVENTS, WEBHOOK_PAGE_SIZE};
