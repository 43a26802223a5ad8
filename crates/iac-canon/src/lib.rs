//! # iac-canon - canonical values from infrastructure as code
//!
//! Loads Terraform modules, Terraform plans and CloudFormation templates and lowers each of them
//! into one plain value tree (see [value::Value]) that a rule engine can evaluate.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `iac-canon` works internally.
//!
//! ### Loading
//!
//! see [loader::Loader::load]
//!
//! Input paths are files, directories or `-` (stdin). Each one is offered to the detectors in a
//! fixed order: tf-plan, cfn, tf. A detector answers with one of
//!
//! - `Decline`: not my format, ask the next one
//! - `Claim`: here is the loaded [loader::ConfigurationUnit]
//! - `Malformed`: my format, but broken (see [detect::MalformedInput])
//!
//! Directories are offered as a whole first. The tf detector claims any directory holding `.tf`
//! files, all of them become one unit. Unclaimed directories are walked in sorted order, hidden
//! entries are skipped. Files that already belong to a unit are not offered again.
//!
//! ### Terraform
//!
//! In hcl terms...
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = value" pair
//!   - or `block`:
//!     - 1 `identifier`
//!     - followed by 0 or more `labels`
//!     - and a `body` enclosed in `{` and `}`
//!
//! All `resource` and `data` blocks of a module are collected in a [tf::TfModule]. Their ids are
//! `type.name` and `data.type.name`.
//!
//! **Example**
//!
//! ```hcl
//! resource "aws_instance" "web" {
//!   ami           = data.aws_ami.latest.id
//!   instance_type = "t3.micro"
//!
//!   ebs_block_device {
//!     volume_size = 8
//!   }
//! }
//!
//! data "aws_ami" "latest" {
//!   most_recent = true
//! }
//! ```
//!
//! renders (see [tf::Renderer]) as
//!
//! ```json
//! {
//!   "hcl_resource_view_version": "0.0.1",
//!   "resources": {
//!     "aws_instance.web": {
//!       "_type": "aws_instance",
//!       "_provider": "aws",
//!       "id": "aws_instance.web",
//!       "ami": "data.aws_ami.latest",
//!       "instance_type": "t3.micro",
//!       "ebs_block_device": [{ "volume_size": 8 }]
//!     },
//!     "data.aws_ami.latest": { ... }
//!   }
//! }
//! ```
//!
//! - references to resources of the module render as the referenced id, never as its content
//! - blocks are always lists, even if there is just one
//! - schema defaults ([schema::SchemaProvider]) are filled in for attributes that are not set
//!
//! Anything else is evaluated with [hcl::eval] in an empty context. When that fails the value is
//! `null` and a warning is logged.
//!
//! ### CloudFormation
//!
//! see [cfn]
//!
//! ### Output
//!
//! Each unit turns into `{"filepath": ..., "content": ...}` ([loader::ConfigurationUnit::canonical])
//! which gets serialized via [serde].
//!
pub mod cfn;
pub mod detect;
pub mod input;
pub mod loader;
pub mod schema;
pub mod tf;
pub mod tfplan;
pub mod value;
mod visit;
