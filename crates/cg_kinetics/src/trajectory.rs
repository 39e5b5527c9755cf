//! XYZ-style trajectory snapshots.
//!
//! Each dump is one text file: a count line, a comment line, then one line
//! per crystal, solution or surface site. Solution and crystal sites are
//! occupied; surface sites are listed too so the crystal envelope stays
//! visible in viewers.

use std::fs::File;
use std::fs;
use std::io::BufWriter;
use std::io::Write;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use cg_rates::RateModel;

use crate::SiteLattice;

/// Render one snapshot in the dump format: `STATE x y z n`, with `C`, `P`
/// or `S` for crystal, solution and surface, and `n` the nearest-neighbor
/// count.
pub fn render<K: RateModel>(lattice: &SiteLattice<K>) -> String {
    let dumped: Vec<_> = lattice
        .sites()
        .iter()
        .filter(|site| site.is_active() || site.is_surface())
        .collect();

    let mut out = String::new();
    out.push_str(&format!("{}\n - \n", dumped.len()));
    for site in dumped {
        let (x, y, z) = site.coords();
        out.push_str(&format!(
            "{} {} {} {} {}\n",
            site.state().symbol(),
            x,
            y,
            z,
            site.n_neighbors(0),
        ));
    }
    out
}

/// Writes numbered snapshot files `<stem><counter>.xyz` into one directory.
pub struct XyzWriter {
    directory: PathBuf,
    stem: String,
    counter: usize,
}

impl XyzWriter {
    pub fn new<P: AsRef<Path>>(directory: P, stem: &str) -> io::Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            stem: stem.to_string(),
            counter: 0,
        })
    }

    /// Number of snapshots written so far.
    pub fn count(&self) -> usize {
        self.counter
    }

    pub fn dump<K: RateModel>(&mut self, lattice: &SiteLattice<K>) -> io::Result<PathBuf> {
        let path = self
            .directory
            .join(format!("{}{}.xyz", self.stem, self.counter));
        self.counter += 1;

        let mut out = BufWriter::new(File::create(&path)?);
        out.write_all(render(lattice).as_bytes())?;
        out.flush()?;
        Ok(path)
    }
}
