// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;
use std::fmt::Write;

use clap::Args;
use regbin::Container;
use regbin::Phase;

use crate::Command;
use crate::ImageArgs;

#[derive(Args)]
pub(crate) struct DumpCommand {
    #[command(flatten)]
    image: ImageArgs,
    /// Print the whole tree in json format
    #[arg(long)]
    json: bool,
}

impl Command for DumpCommand {
    fn run(self) -> anyhow::Result<()> {
        let container = self.image.load()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&container)?);
        } else {
            print!("{}", summary(&container)?);
        }
        Ok(())
    }
}

fn summary(c: &Container) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_summary(&mut out, c)?;
    Ok(out)
}

fn write_summary(out: &mut impl Write, c: &Container) -> fmt::Result {
    let h = &c.header;
    writeln!(
        out,
        "image size {}, checksum {:#010x}, format {:#x}, driver format {:#x}, timestamp {}",
        h.image_size, h.checksum, h.format_version, h.driver_format_version, h.timestamp
    )?;
    writeln!(
        out,
        "platform {}, family {}, devices {:02x?}",
        h.platform_type, h.device_family, h.device_ids
    )?;
    writeln!(
        out,
        "{} of {} profiles usable",
        c.profile_count(),
        h.profile_count
    )?;
    for (i, p) in c.profiles.iter().enumerate() {
        writeln!(
            out,
            "profile {} {:?}: {}/{} blocks, active channels {:#04x}",
            i + 1,
            p.name.as_deref().unwrap_or(""),
            p.blocks.len(),
            p.declared_block_count,
            p.active_channels(h.device_count).bits()
        )?;
        for phase in Phase::ALL {
            let (blocks, directives) = p
                .blocks_for(phase)
                .fold((0, 0), |(b, d), (_, block)| (b + 1, d + block.directives.len()));
            if blocks > 0 {
                writeln!(out, "  {}: {} blocks, {} directives", phase, blocks, directives)?;
            }
        }
    }
    for issue in c.issues() {
        match issue.block {
            Some(block) => writeln!(
                out,
                "issue: profile {} block {}: {}",
                issue.profile, block, issue.error
            )?,
            None => writeln!(out, "issue: profile {}: {}", issue.profile, issue.error)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use regbin::Container;
    use regbin::ParseSettings;

    use super::summary;

    #[test]
    fn summary_lists_phases_and_issues() {
        let mut blob = vec![0, 0, 0, 53, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0];
        blob.extend([3, 4, 0, 1, 0x4c, 0, 0, 0, 1, 0, 0, 0, 20]);
        blob.extend([0, 0, 0, 2]);
        blob.extend([0, 2, 0, 0, 0, 0, 0, 4, 0, 0, 0, 1, 0, 3, 0, 5]);
        let c = Container::parse(&blob, &ParseSettings::default()).unwrap();
        let text = summary(&c).unwrap();
        assert!(text.contains("devices [4c]"), "{text}");
        assert!(text.contains("profile 1 \"\": 1/2 blocks"), "{text}");
        assert!(text.contains("  post-power-up: 1 blocks, 1 directives"), "{text}");
        assert!(text.contains("issue: profile 1 block 1:"), "{text}");
    }
}
