#![forbid(unsafe_code)]

// End-to-end contracts of the bridge, driven through the public surface of the three crates
// with a recording GPU and a scripted producer standing in for the platform.

#[cfg(test)]
mod doubles;

#[cfg(test)]
mod coalescing;
